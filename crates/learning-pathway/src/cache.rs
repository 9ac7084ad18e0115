/// In-memory content cache and the read-only curriculum queries over it.
///
/// Populated lazily by the loader:
/// - the structure document (singleton)
/// - modules by id, real or placeholder; the first value stored for an id wins
///
/// The loader publishes it as an immutable `Arc` snapshot, so a caller holding query
/// results never blocks a load.
///
/// Every query here is a pure read. Modules without a cache entry are invisible to
/// ordering and grouping queries.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::model::{Module, Phase, Structure, Topic};

const UNKNOWN_PHASE: &str = "Unknown Phase";

#[derive(Debug, Default, Clone)]
pub struct ContentCache {
    structure: Option<Structure>,
    modules: HashMap<String, Arc<Module>>,
}

/// A phase or specialized area with its cached modules resolved, ordered by `order`.
#[derive(Debug, Clone)]
pub struct PhaseModules {
    pub id: String,
    pub name: String,
    pub description: String,
    pub modules: Vec<Arc<Module>>,
}

/// A topic together with the id of the module that owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopicRef<'a> {
    pub module_id: &'a str,
    pub topic: &'a Topic,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Population ---

    pub fn structure(&self) -> Option<&Structure> {
        self.structure.as_ref()
    }

    pub fn set_structure(&mut self, structure: Structure) -> &Structure {
        self.structure.insert(structure)
    }

    pub fn cached_module(&self, id: &str) -> Option<Arc<Module>> {
        self.modules.get(id).cloned()
    }

    /// Stores `module` unless the id is already cached, returning the cached value.
    pub fn insert_module(&mut self, module: Module) -> Arc<Module> {
        Arc::clone(
            self.modules
                .entry(module.id.clone())
                .or_insert_with(|| Arc::new(module)),
        )
    }

    // --- Modules ---

    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.get(id).map(Arc::as_ref)
    }

    /// Every cached module by ascending `order`, ties broken by id.
    pub fn all_modules(&self) -> Vec<&Module> {
        let mut modules: Vec<&Module> = self.modules.values().map(Arc::as_ref).collect();
        modules.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        modules
    }

    /// Number of module references in the structure, duplicates included.
    pub fn module_count(&self) -> usize {
        self.structure.as_ref().map_or(0, Structure::module_count)
    }

    pub fn modules_by_phase(&self) -> Vec<PhaseModules> {
        let Some(structure) = &self.structure else {
            return Vec::new();
        };
        structure
            .all_groups()
            .map(|group| {
                let mut modules: Vec<Arc<Module>> = group
                    .modules
                    .iter()
                    .filter_map(|id| self.cached_module(id))
                    .collect();
                modules.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
                PhaseModules {
                    id: group.id.clone(),
                    name: group.name.clone(),
                    description: group.description.clone(),
                    modules,
                }
            })
            .collect()
    }

    pub fn module_by_order(&self, order: i64) -> Option<&Module> {
        self.all_modules().into_iter().find(|m| m.order == order)
    }

    /// The module whose order is exactly one more. Gaps in the sequence end navigation.
    pub fn next_module(&self, id: &str) -> Option<&Module> {
        let module = self.module(id)?;
        self.module_by_order(module.order.checked_add(1)?)
    }

    pub fn previous_module(&self, id: &str) -> Option<&Module> {
        let module = self.module(id)?;
        self.module_by_order(module.order.checked_sub(1)?)
    }

    /// Orders shared by more than one cached module, with the ids sharing each.
    pub fn duplicate_orders(&self) -> Vec<(i64, Vec<&str>)> {
        let mut by_order: BTreeMap<i64, Vec<&str>> = BTreeMap::new();
        for module in self.all_modules() {
            by_order.entry(module.order).or_default().push(&module.id);
        }
        by_order.into_iter().filter(|(_, ids)| ids.len() > 1).collect()
    }

    // --- Topics ---

    pub fn topic(&self, module_id: &str, topic_id: &str) -> Option<&Topic> {
        self.module(module_id)?
            .topics
            .iter()
            .find(|t| t.id == topic_id)
    }

    /// The following topic in the module, else the first topic of the next module.
    pub fn next_topic(&self, module_id: &str, topic_id: &str) -> Option<TopicRef<'_>> {
        let module = self.module(module_id)?;
        let index = module.topics.iter().position(|t| t.id == topic_id)?;
        if let Some(topic) = module.topics.get(index + 1) {
            return Some(TopicRef {
                module_id: &module.id,
                topic,
            });
        }
        let next = self.next_module(module_id)?;
        next.topics.first().map(|topic| TopicRef {
            module_id: &next.id,
            topic,
        })
    }

    /// The preceding topic in the module, else the last topic of the previous module.
    pub fn previous_topic(&self, module_id: &str, topic_id: &str) -> Option<TopicRef<'_>> {
        let module = self.module(module_id)?;
        let index = module.topics.iter().position(|t| t.id == topic_id)?;
        if index > 0 {
            return Some(TopicRef {
                module_id: &module.id,
                topic: &module.topics[index - 1],
            });
        }
        let previous = self.previous_module(module_id)?;
        previous.topics.last().map(|topic| TopicRef {
            module_id: &previous.id,
            topic,
        })
    }

    // --- Phases ---

    /// Phases are searched before specialized areas.
    pub fn phase(&self, id: &str) -> Option<&Phase> {
        self.structure.as_ref()?.all_groups().find(|p| p.id == id)
    }

    pub fn all_phases(&self) -> &[Phase] {
        self.structure
            .as_ref()
            .map(|s| s.phases.as_slice())
            .unwrap_or(&[])
    }

    pub fn specialized_areas(&self) -> &[Phase] {
        self.structure
            .as_ref()
            .map(Structure::specialized_areas)
            .unwrap_or(&[])
    }

    pub fn find_phase_for_module(&self, module_id: &str) -> Option<&Phase> {
        self.structure
            .as_ref()?
            .all_groups()
            .find(|p| p.modules.iter().any(|id| id == module_id))
    }

    pub fn phase_name_for_module(&self, module_id: &str) -> &str {
        self.find_phase_for_module(module_id)
            .map_or(UNKNOWN_PHASE, |p| p.name.as_str())
    }
}
