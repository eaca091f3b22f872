use serde::Serialize;
use souvenir_core::ipc::{SouvenirRequest, SouvenirResponse};

use crate::pipeline::Pipeline;
use crate::subsystems::suggest::SuggestionSession;

pub fn handle_request(
    request: SouvenirRequest,
    pipeline: &Pipeline,
    session: &mut SuggestionSession,
) -> SouvenirResponse {
    match request {
        SouvenirRequest::Ping => SouvenirResponse::pong(),
        SouvenirRequest::Extract { text } => respond(&pipeline.extractor.extract(&text)),
        SouvenirRequest::Classify {
            text,
            context,
            memory,
        } => respond(&pipeline.classifier.classify(&text, context.as_ref(), &memory)),
        SouvenirRequest::DetectChanges {
            text,
            context,
            memory,
        } => {
            let candidates = pipeline
                .classifier
                .detect_changes(&text, context.as_ref(), &memory);
            let kinds = pipeline.classifier.change_kinds(&text);
            respond(&serde_json::json!({
                "kinds": kinds,
                "candidates": candidates,
            }))
        }
        SouvenirRequest::Contradictions { text, memory } => {
            respond(&pipeline.detector.detect_contradictions(&text, &memory))
        }
        SouvenirRequest::Consolidate { candidates } => {
            respond(&pipeline.consolidator.consolidate_detailed(candidates))
        }
        SouvenirRequest::ProcessTurn {
            text,
            context,
            memory,
            max,
        } => {
            let max = max.unwrap_or_else(|| pipeline.suggestions.default_max());
            respond(&pipeline.process_turn(&text, context.as_ref(), &memory, session, max))
        }
        SouvenirRequest::Suggest {
            recent,
            memory,
            max,
        } => {
            let max = max.unwrap_or_else(|| pipeline.suggestions.default_max());
            respond(
                &pipeline
                    .suggestions
                    .generate_suggestions(session, &recent, &memory, max),
            )
        }
        SouvenirRequest::Gaps { memory } => {
            let gaps = pipeline.suggestions.analyze_memory_gaps(&memory);
            let coverage: serde_json::Map<String, serde_json::Value> = pipeline
                .suggestions
                .category_coverage(&memory)
                .into_iter()
                .map(|(category, count)| (category.to_string(), count.into()))
                .collect();
            respond(&serde_json::json!({
                "missing_categories": gaps.missing_categories,
                "suggestions": gaps.suggestions,
                "coverage": coverage,
            }))
        }
        SouvenirRequest::MarkUsed { id } => {
            let newly_marked = session.mark_used(&id);
            SouvenirResponse::ok(serde_json::json!({
                "id": id,
                "newly_marked": newly_marked,
                "used": session.len(),
            }))
        }
        SouvenirRequest::RulesInfo => respond(&pipeline.rules.summary()),
    }
}

fn respond<T: Serialize + ?Sized>(data: &T) -> SouvenirResponse {
    match serde_json::to_value(data) {
        Ok(value) => SouvenirResponse::ok(value),
        Err(e) => SouvenirResponse::err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(raw: &str) -> SouvenirRequest {
        serde_json::from_str(raw).expect("valid request")
    }

    #[test]
    fn test_ping() {
        let pipeline = Pipeline::builtin().unwrap();
        let mut session = pipeline.new_session();
        let resp = handle_request(SouvenirRequest::Ping, &pipeline, &mut session);
        assert!(resp.is_ok());
        assert_eq!(resp.data, Some(serde_json::json!({"pong": true})));
    }

    #[test]
    fn test_mark_used_then_suggest() {
        let pipeline = Pipeline::builtin().unwrap();
        let mut session = pipeline.new_session();
        let suggest = r#"{"action":"suggest","recent":["Je pars en vacances"],"max":10}"#;

        let before = handle_request(request(suggest), &pipeline, &mut session);
        let before = before.data.unwrap();
        let first_id = before[0]["id"].as_str().unwrap().to_string();
        let count = before.as_array().unwrap().len();

        let mark = format!(r#"{{"action":"mark_used","id":"{}"}}"#, first_id);
        let resp = handle_request(request(&mark), &pipeline, &mut session);
        assert_eq!(resp.data.as_ref().unwrap()["newly_marked"], true);
        let resp = handle_request(request(&mark), &pipeline, &mut session);
        assert_eq!(resp.data.as_ref().unwrap()["newly_marked"], false);
        assert_eq!(session.len(), 1);

        let after = handle_request(request(suggest), &pipeline, &mut session).data.unwrap();
        assert_eq!(after.as_array().unwrap().len(), count - 1);
    }

    #[test]
    fn test_gaps_includes_coverage() {
        let pipeline = Pipeline::builtin().unwrap();
        let mut session = pipeline.new_session();
        let resp = handle_request(request(r#"{"action":"gaps"}"#), &pipeline, &mut session);
        let data = resp.data.unwrap();
        assert_eq!(data["missing_categories"].as_array().unwrap().len(), 11);
        assert_eq!(data["coverage"]["santé"], 0);
    }

    #[test]
    fn test_rules_info() {
        let pipeline = Pipeline::builtin().unwrap();
        let mut session = pipeline.new_session();
        let resp = handle_request(SouvenirRequest::RulesInfo, &pipeline, &mut session);
        let data = resp.data.unwrap();
        assert_eq!(data["version"], pipeline.rules.version.as_str());
        assert!(data["patterns"].as_u64().unwrap() > 0);
    }
}
