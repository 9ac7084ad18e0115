/// Completion figures derived from the cached curriculum and the learner's state.
///
/// Percentages round half up, like the dashboard always displayed them.
use serde::Serialize;

use crate::cache::ContentCache;
use crate::model::{Module, UserData};

/// Rough effort estimate per completed subtopic.
const MINUTES_PER_SUBTOPIC: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallProgress {
    pub completed_modules: usize,
    pub total_modules: usize,
    pub completed_subtopics: usize,
    pub total_subtopics: usize,
    pub percent: u32,
    pub estimated_hours: usize,
}

pub fn module_progress(module: &Module, data: &UserData) -> ModuleProgress {
    let total = module.subtopic_ids().count();
    let completed = module
        .subtopic_ids()
        .filter(|id| data.is_subtopic_completed(id))
        .count();
    ModuleProgress {
        completed,
        total,
        percent: percent(completed, total),
    }
}

/// Modules count as completed only while they are present in the cache.
pub fn overall_progress(cache: &ContentCache, data: &UserData) -> OverallProgress {
    let modules = cache.all_modules();
    let completed_modules = modules
        .iter()
        .filter(|m| data.is_module_completed(&m.id))
        .count();

    let (completed_subtopics, total_subtopics) =
        modules.iter().fold((0, 0), |(completed, total), module| {
            let p = module_progress(module, data);
            (completed + p.completed, total + p.total)
        });

    OverallProgress {
        completed_modules,
        total_modules: modules.len(),
        completed_subtopics,
        total_subtopics,
        percent: percent(completed_subtopics, total_subtopics),
        estimated_hours: round_div(completed_subtopics * MINUTES_PER_SUBTOPIC, 60),
    }
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    round_div(part * 100, total) as u32
}

/// Integer division rounding half up.
fn round_div(n: usize, d: usize) -> usize {
    (2 * n + d) / (2 * d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::populated;
    use crate::model::Settings;

    fn learner(modules: &[&str], subtopics: &[&str]) -> UserData {
        let mut data = UserData::new(Settings::default());
        data.completed_modules = modules.iter().map(|s| s.to_string()).collect();
        data.completed_topics = subtopics.iter().map(|s| s.to_string()).collect();
        data
    }

    #[test]
    fn module_progress_rounds_half_up() {
        let cache = populated();
        let module = cache.module("module-1").unwrap();
        let p = module_progress(module, &learner(&[], &["s1"]));
        assert_eq!((p.completed, p.total), (1, 3));
        assert_eq!(p.percent, 33);

        let p = module_progress(module, &learner(&[], &["s1", "s3"]));
        assert_eq!(p.percent, 67);

        let empty = cache.module("module-3").unwrap();
        assert_eq!(module_progress(empty, &learner(&[], &["s1"])).percent, 0);
    }

    #[test]
    fn overall_progress_counts_cached_content_only() {
        let cache = populated();
        let data = learner(&["module-1", "module-99"], &["s1", "s2", "s3", "gone"]);
        let p = overall_progress(&cache, &data);
        assert_eq!(p.completed_modules, 1);
        assert_eq!(p.total_modules, 4);
        assert_eq!(p.completed_subtopics, 3);
        assert_eq!(p.total_subtopics, 5);
        assert_eq!(p.percent, 60);
        // 30 minutes rounds up to one hour.
        assert_eq!(p.estimated_hours, 1);
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(0, 0), 0);
        assert_eq!(round_div(20, 60), 0);
        assert_eq!(round_div(90, 60), 2);
    }
}
