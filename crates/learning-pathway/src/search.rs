/// Case-insensitive substring search over the cached curriculum.
///
/// Walks modules in display order and, inside each, the module itself, then every
/// topic and its subtopics. No index and no ranking: results come back in walk order
/// and the walk stops as soon as `max_results` is reached.
use serde::Serialize;

use crate::cache::ContentCache;

const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchResultKind {
    Module,
    Topic,
    Subtopic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub kind: SearchResultKind,
    pub id: String,
    pub title: String,
    pub context: String,
    /// Display name of the owning phase.
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
}

pub fn search(cache: &ContentCache, query: &str, max_results: usize) -> Vec<SearchResult> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS || max_results == 0 {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    let matches = |text: &str| text.to_lowercase().contains(&needle);

    let mut results = Vec::new();
    for module in cache.all_modules() {
        let phase = cache.phase_name_for_module(&module.id);

        if matches(module.title.as_str()) || matches(module.description.as_str()) {
            results.push(SearchResult {
                kind: SearchResultKind::Module,
                id: module.id.clone(),
                title: module.title.clone(),
                context: module.description.clone(),
                phase: phase.to_string(),
                module_id: None,
                topic_id: None,
            });
            if results.len() >= max_results {
                return results;
            }
        }

        for topic in &module.topics {
            let description = topic.description.as_deref().unwrap_or_default();
            if matches(topic.title.as_str()) || matches(description) {
                results.push(SearchResult {
                    kind: SearchResultKind::Topic,
                    id: topic.id.clone(),
                    title: topic.title.clone(),
                    context: description.to_string(),
                    phase: phase.to_string(),
                    module_id: Some(module.id.clone()),
                    topic_id: None,
                });
                if results.len() >= max_results {
                    return results;
                }
            }

            for subtopic in &topic.subtopics {
                if matches(subtopic.title.as_str()) {
                    results.push(SearchResult {
                        kind: SearchResultKind::Subtopic,
                        id: subtopic.id.clone(),
                        title: subtopic.title.clone(),
                        context: format!("From: {}", topic.title),
                        phase: phase.to_string(),
                        module_id: Some(module.id.clone()),
                        topic_id: Some(topic.id.clone()),
                    });
                    if results.len() >= max_results {
                        return results;
                    }
                }
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::populated;

    #[test]
    fn short_queries_return_nothing() {
        let cache = populated();
        assert!(search(&cache, "", 50).is_empty());
        assert!(search(&cache, "i", 50).is_empty());
        assert!(search(&cache, "  s  ", 50).is_empty());
        assert!(search(&cache, "install", 0).is_empty());
    }

    #[test]
    fn subtopic_match_carries_ancestors() {
        let cache = populated();
        let results = search(&cache, "SOCKET", 50);
        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.kind, SearchResultKind::Subtopic);
        assert_eq!(hit.id, "s9");
        assert_eq!(hit.topic_id.as_deref(), Some("t9"));
        assert_eq!(hit.module_id.as_deref(), Some("module-10"));
        assert_eq!(hit.context, "From: Networking");
        assert_eq!(hit.phase, "Multiplayer");
    }

    #[test]
    fn module_and_topic_matches_in_walk_order() {
        let cache = populated();
        // Module titles are "Title of module-N"; descriptions are "About module-N".
        let results = search(&cache, "module-1", 50);
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["module-1", "module-10"]);
        assert_eq!(results[0].context, "About module-1");
        assert_eq!(results[0].phase, "Foundations");
        assert_eq!(results[0].module_id, None);

        let results = search(&cache, "first scene", 50);
        assert_eq!(results[0].kind, SearchResultKind::Topic);
        assert_eq!(results[0].module_id.as_deref(), Some("module-1"));
        assert_eq!(results[0].context, "");
    }

    #[test]
    fn stops_at_max_results() {
        let cache = populated();
        let all = search(&cache, "title of", 50);
        assert_eq!(all.len(), 4);
        let capped = search(&cache, "title of", 2);
        assert_eq!(capped, all[..2].to_vec());
    }

    #[test]
    fn results_serialize_with_type_tag() {
        let cache = populated();
        let value = serde_json::to_value(&search(&cache, "download", 50)[0]).unwrap();
        assert_eq!(value["type"], "subtopic");
        assert_eq!(value["moduleId"], "module-1");
        assert_eq!(value["topicId"], "t1");
    }
}
