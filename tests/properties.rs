use futures::stream::{self, StreamExt};
use proptest::prelude::*;
use recipe_chat::diff::{diff_recipes, NO_CHANGES_SUMMARY};
use recipe_chat::error::StreamFailure;
use recipe_chat::recipe::RecipeRecord;
use recipe_chat::recipe_parser::{parse_recipe_response, strip_code_fences};
use recipe_chat::streaming::{sink_fn, BackendResponse, SinkError, StreamEvent};
use tokio::sync::mpsc;

fn entries() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,6}( [a-z]{1,6})?", 0..6)
}

fn record() -> impl Strategy<Value = RecipeRecord> {
    (
        "[A-Z][a-z]{0,10}",
        entries(),
        entries(),
        prop::option::of("[A-Z][a-z]{2,8}"),
        prop::option::of(entries()),
    )
        .prop_map(|(title, ingredients, instructions, cuisine_type, dietary_restrictions)| RecipeRecord {
            id: None,
            recipe_id: "prop".to_string(),
            title,
            ingredients,
            instructions,
            prep_time: "10 minutes".to_string(),
            difficulty: "Easy".to_string(),
            cuisine_type,
            dietary_restrictions,
            rating: None,
            created_at: None,
            updated_at: None,
        })
}

fn chunked(text: &str, size: usize) -> Vec<Vec<u8>> {
    text.as_bytes().chunks(size).map(<[u8]>::to_vec).collect()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn diff_of_identical_records_is_empty(r in record()) {
        let diff = diff_recipes(&r, &r);
        prop_assert_eq!(diff.summary, NO_CHANGES_SUMMARY);
        prop_assert!(diff.details.is_empty());
    }

    #[test]
    fn added_and_removed_are_mirror_images(a in record(), b in record()) {
        let forward = diff_recipes(&a, &b).details;
        let backward = diff_recipes(&b, &a).details;
        prop_assert_eq!(&forward.added_ingredients, &backward.removed_ingredients);
        prop_assert_eq!(&forward.removed_ingredients, &backward.added_ingredients);
        prop_assert_eq!(&forward.added_instructions, &backward.removed_instructions);
        prop_assert_eq!(&forward.removed_instructions, &backward.added_instructions);
        prop_assert_eq!(&forward.added_dietary, &backward.removed_dietary);
        prop_assert_eq!(&forward.removed_dietary, &backward.added_dietary);
    }

    #[test]
    fn fenced_payload_strips_to_the_trimmed_body(body in "[a-zA-Z0-9{}\":,\\[\\] \n]{0,60}", upper in any::<bool>()) {
        let tag = if upper { "JSON" } else { "json" };
        let fenced = format!("```{}\n{}\n```", tag, body);
        prop_assert_eq!(strip_code_fences(&fenced), body.trim());
        prop_assert_eq!(strip_code_fences(&body), body.trim());
    }

    #[test]
    fn fenced_and_bare_responses_parse_alike(
        title in "[A-Z][a-z]{0,10}",
        ingredients in prop::collection::vec("[a-z]{1,6}", 1..4),
        instructions in prop::collection::vec("[a-z]{1,6}( [a-z]{1,6})?", 1..4),
        upper in any::<bool>(),
    ) {
        let bare = serde_json::json!({
            "title": title,
            "ingredients": ingredients,
            "instructions": instructions,
            "prep_time": "15 minutes",
            "difficulty": "Medium",
        })
        .to_string();
        let tag = if upper { "JSON" } else { "json" };
        let fenced = format!("```{}\n{}\n```", tag, bare);

        let mut from_bare = parse_recipe_response(&bare).unwrap();
        let from_fenced = parse_recipe_response(&fenced).unwrap();
        from_bare.recipe_id = from_fenced.recipe_id.clone();
        prop_assert_eq!(from_bare, from_fenced);
    }

    #[test]
    fn pull_stream_accumulates_exactly(text in "\\PC{0,80}", size in 1usize..8) {
        let chunks = chunked(&text, size);
        let (result, forwarded) = block_on(async move {
            let response = BackendResponse::Pull(
                stream::iter(chunks.into_iter().map(Ok::<_, StreamFailure>)).boxed(),
            );
            let mut forwarded: Vec<String> = Vec::new();
            let result = response.consume(&mut forwarded).await;
            (result, forwarded)
        });
        prop_assert_eq!(result.unwrap(), text.clone());
        prop_assert_eq!(forwarded.concat(), text);
    }

    #[test]
    fn push_stream_accumulates_exactly(text in "\\PC{0,80}", size in 1usize..8) {
        let chunks = chunked(&text, size);
        let result = block_on(async move {
            let (events, receiver) = mpsc::channel(4);
            tokio::spawn(async move {
                for chunk in chunks {
                    if events.send(StreamEvent::Data(chunk)).await.is_err() {
                        return;
                    }
                }
                let _ = events.send(StreamEvent::End).await;
            });
            BackendResponse::Push(receiver).consume(&mut Vec::<String>::new()).await
        });
        prop_assert_eq!(result.unwrap(), text);
    }

    #[test]
    fn failing_sink_never_changes_the_result(text in "\\PC{0,80}", size in 1usize..8, buffered in any::<bool>()) {
        let chunks = chunked(&text, size);
        let full = text.clone();
        let result = block_on(async move {
            let response = if buffered {
                BackendResponse::Buffered(full)
            } else {
                BackendResponse::Pull(stream::iter(chunks.into_iter().map(Ok::<_, StreamFailure>)).boxed())
            };
            let mut sink = sink_fn(|_: &str| Err(SinkError("closed".to_string())));
            response.consume(&mut sink).await
        });
        prop_assert_eq!(result.unwrap(), text);
    }
}
