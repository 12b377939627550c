//! Named command groups with case-insensitive global names and local aliases.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::command::CommandId;
use crate::errors::RegistryError;

pub const SYSTEM_GROUP: &str = "system";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Upper-case global name, e.g. `LINE`.
    pub global: String,
    /// Upper-case local alias, e.g. `L`. Equal to `global` when none was given.
    pub local: String,
    pub command: CommandId,
}

#[derive(Debug, Clone, Default)]
pub struct CommandGroup {
    pub name: String,
    commands: Vec<CommandSpec>,
}

impl CommandGroup {
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    groups: IndexMap<String, CommandGroup>,
    /// Upper-case name or alias -> (group index, command index).
    index: HashMap<String, (usize, usize)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with every built-in command.
    pub fn with_defaults() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_defaults()?;
        Ok(registry)
    }

    fn register_defaults(&mut self) -> Result<(), RegistryError> {
        const DEFAULTS: &[(&str, &str, &str, CommandId)] = &[
            ("draw", "LINE", "L", CommandId::Line),
            ("draw", "CIRCLE", "C", CommandId::Circle),
            ("draw", "ARC", "A", CommandId::Arc),
            ("draw", "RECTANGLE", "REC", CommandId::Rectangle),
            ("draw", "PLINE", "PL", CommandId::Pline),
            ("modify", "MOVE", "M", CommandId::Move),
            ("modify", "COPY", "CO", CommandId::Copy),
            ("modify", "ERASE", "E", CommandId::Erase),
            ("modify", "TRIM", "TR", CommandId::Trim),
            ("modify", "EXTEND", "EX", CommandId::Extend),
            ("modify", "OFFSET", "O", CommandId::Offset),
            ("modify", "PEDIT", "PE", CommandId::Pedit),
            ("annotate", "DIM", "DIM", CommandId::DimLinear),
            ("annotate", "DIMLINEAR", "DLI", CommandId::DimLinear),
            ("annotate", "DIMHOR", "DH", CommandId::DimHorizontal),
            ("annotate", "DIMVER", "DV", CommandId::DimVertical),
            ("annotate", "DIMALIGNED", "DAL", CommandId::DimAligned),
            ("annotate", "DIMANGULAR", "DAN", CommandId::DimAngular),
            (SYSTEM_GROUP, "DIST", "DI", CommandId::Dist),
            (SYSTEM_GROUP, "ZOOM", "Z", CommandId::Zoom),
            (SYSTEM_GROUP, "ZOOMWINDOW", "ZW", CommandId::ZoomWindow),
            (SYSTEM_GROUP, "ZOOMEXTENTS", "ZE", CommandId::ZoomExtents),
            (SYSTEM_GROUP, "ZOOMALL", "ZA", CommandId::ZoomAll),
        ];

        for (group, global, local, command) in DEFAULTS {
            self.register(group, global, Some(*local), *command)?;
        }
        Ok(())
    }

    /// Adds a command to `group`, creating the group on first use. Neither name may
    /// collide with any name or alias already registered in any group.
    pub fn register(
        &mut self,
        group: &str,
        global: &str,
        local: Option<&str>,
        command: CommandId,
    ) -> Result<(), RegistryError> {
        let global = global.trim().to_uppercase();
        if global.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let local = local
            .map(|alias| alias.trim().to_uppercase())
            .filter(|alias| !alias.is_empty())
            .unwrap_or_else(|| global.clone());

        for name in [&global, &local] {
            if let Some(&(group_index, _)) = self.index.get(name) {
                let owner = self
                    .groups
                    .get_index(group_index)
                    .map(|(name, _)| name.clone())
                    .unwrap_or_default();
                return Err(RegistryError::Conflict {
                    name: name.clone(),
                    group: owner,
                });
            }
        }

        let entry = self.groups.entry(group.to_string());
        let group_index = entry.index();
        let group_entry = entry.or_insert_with(|| CommandGroup {
            name: group.to_string(),
            commands: Vec::new(),
        });
        let command_index = group_entry.commands.len();
        group_entry.commands.push(CommandSpec {
            global: global.clone(),
            local: local.clone(),
            command,
        });

        self.index.insert(global.clone(), (group_index, command_index));
        self.index.insert(local, (group_index, command_index));
        debug!(group, command = %global, "registered command");
        Ok(())
    }

    /// Resolves a global name or local alias, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        let (group_index, command_index) = *self.index.get(&name.trim().to_uppercase())?;
        self.groups
            .get_index(group_index)
            .and_then(|(_, group)| group.commands.get(command_index))
    }

    /// Commands whose global name or alias starts with `prefix`, in registration order.
    pub fn search(&self, prefix: &str) -> Vec<(&str, &CommandSpec)> {
        let prefix = prefix.trim().to_uppercase();
        self.groups
            .iter()
            .flat_map(|(name, group)| {
                group
                    .commands
                    .iter()
                    .map(move |spec| (name.as_str(), spec))
            })
            .filter(|(_, spec)| spec.global.starts_with(&prefix) || spec.local.starts_with(&prefix))
            .collect()
    }

    pub fn group(&self, name: &str) -> Option<&CommandGroup> {
        self.groups.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = &CommandGroup> {
        self.groups.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_keep_registration_order() {
        let registry = CommandRegistry::with_defaults().expect("defaults register cleanly");
        let names: Vec<&str> = registry.groups().map(|group| group.name.as_str()).collect();
        assert_eq!(names, vec!["draw", "modify", "annotate", SYSTEM_GROUP]);
        let draw = registry.group("draw").expect("draw group");
        assert_eq!(draw.commands().first().map(|spec| spec.global.as_str()), Some("LINE"));
    }

    #[test]
    fn lookup_matches_names_and_aliases_in_any_case() {
        let registry = CommandRegistry::with_defaults().expect("defaults register cleanly");
        assert_eq!(registry.lookup("line").map(|spec| spec.command), Some(CommandId::Line));
        assert_eq!(registry.lookup("L").map(|spec| spec.command), Some(CommandId::Line));
        assert_eq!(registry.lookup("dim").map(|spec| spec.command), Some(CommandId::DimLinear));
        assert_eq!(registry.lookup("za").map(|spec| spec.command), Some(CommandId::ZoomAll));
        assert!(registry.lookup("NOTEXIST").is_none());
    }

    #[test]
    fn duplicate_names_conflict_across_groups() {
        let mut registry = CommandRegistry::with_defaults().expect("defaults register cleanly");
        let err = registry
            .register("custom", "LONGLINE", Some("l"), CommandId::Line)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Conflict {
                name: "L".to_string(),
                group: "draw".to_string()
            }
        );
        assert!(registry.lookup("LONGLINE").is_none());
        assert_eq!(
            registry.register("custom", "  ", None, CommandId::Line),
            Err(RegistryError::EmptyName)
        );
    }

    #[test]
    fn prefix_search_reports_the_owning_group() {
        let registry = CommandRegistry::with_defaults().expect("defaults register cleanly");
        let found: Vec<(&str, &str)> = registry
            .search("li")
            .into_iter()
            .map(|(group, spec)| (group, spec.global.as_str()))
            .collect();
        assert_eq!(found, vec![("draw", "LINE")]);

        let zooms = registry.search("ZOOM");
        assert_eq!(zooms.len(), 4);
        assert!(zooms.iter().all(|(group, _)| *group == SYSTEM_GROUP));
    }

    #[test]
    fn custom_groups_are_created_on_demand() {
        let mut registry = CommandRegistry::new();
        registry
            .register("tools", "MEASURE", None, CommandId::Dist)
            .expect("register");
        let spec = registry.lookup("measure").expect("registered");
        assert_eq!(spec.local, "MEASURE");
        assert_eq!(registry.group("tools").map(|group| group.commands().len()), Some(1));
    }
}
