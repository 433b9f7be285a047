//! Integration tests for the natural-language-to-SQL retry loop.
//!
//! Runs `Resolver` against a seeded in-memory database with a scripted
//! model standing in for the API.

use std::sync::Arc;

use ai_cookbook::models::message::Role;
use ai_cookbook::persistence::executor::{QueryExecutor, SqliteExecutor};
use ai_cookbook::persistence::schema;
use ai_cookbook::resolver::prompt::RETRY_INSTRUCTION;
use ai_cookbook::resolver::{Resolver, MAX_ATTEMPTS};
use ai_cookbook::trace::JsonlStepWriter;
use ai_cookbook::AppError;
use serde_json::json;

use super::test_helpers::{read_steps, seeded_db, ScriptedModel};

const MONTHLY_TOTALS: &str = "SELECT strftime('%Y-%m', \"createdAt\") AS \"month\", COUNT(*) AS \"total\"\nFROM \"Order\"\nWHERE strftime('%Y-%m', \"createdAt\") = '2024-05'\nGROUP BY \"month\"";

async fn resolver_for(model: Arc<ScriptedModel>) -> (Resolver, SqliteExecutor) {
    let pool = seeded_db().await;
    let schema_text = schema::sql_schema(
        &pool,
        &["User", "Order", "OrderEntry", "Product"].map(String::from),
    )
    .await
    .expect("schema");
    let executor = SqliteExecutor::new(Arc::clone(&pool));
    let resolver = Resolver::new(model, Arc::new(executor.clone()), schema_text);
    (resolver, executor)
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_owned()).collect()
}

#[tokio::test]
async fn fenced_sql_on_first_attempt_resolves_in_one() {
    let completion = format!("Here is your query:\n```sql\n{MONTHLY_TOTALS}\n```\nEnjoy!");
    let model = ScriptedModel::new([completion]);
    let (resolver, executor) = resolver_for(Arc::clone(&model)).await;
    let expected = columns(&["month", "total"]);

    let outcome = resolver
        .resolve("total orders last month", Some(expected.as_slice()))
        .await
        .expect("resolve");

    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.query, MONTHLY_TOTALS);
    assert_eq!(outcome.result.len(), 1);
    assert_eq!(outcome.result[0]["month"], json!("2024-05"));
    assert_eq!(outcome.result[0]["total"], json!(2));
    assert_eq!(model.calls(), 1);

    let direct = executor.execute(&outcome.query).await.expect("direct");
    assert_eq!(outcome.result, direct);
}

#[tokio::test]
async fn initial_conversation_embeds_schema_and_columns() {
    let model = ScriptedModel::new([MONTHLY_TOTALS]);
    let (resolver, _executor) = resolver_for(Arc::clone(&model)).await;
    let expected = columns(&["month", "total"]);

    resolver
        .resolve("total orders last month", Some(expected.as_slice()))
        .await
        .expect("resolve");

    let messages = model.messages_at(0);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains("Escape table and column names with double quotes."));
    assert!(messages[0].content.contains("\"OrderEntry\""));
    assert_eq!(messages[1].role, Role::User);
    assert!(messages[1].content.ends_with("the output should have the following columns:\nmonth, total"));
}

#[tokio::test]
async fn raw_completion_without_fence_is_executed_verbatim() {
    let raw = r#"SELECT "name" FROM "User" ORDER BY "id""#;
    let model = ScriptedModel::new([raw]);
    let (resolver, _executor) = resolver_for(model).await;

    let outcome = resolver.resolve("list user names", None).await.expect("resolve");

    assert_eq!(outcome.query, raw);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.result.len(), 3);
}

#[tokio::test]
async fn retries_with_corrective_feedback_until_valid() {
    let model = ScriptedModel::new([
        "I think you want the orders table.".to_owned(),
        "```sql\nSELECT * FROM Orders\n```".to_owned(),
        format!("```sql\n{MONTHLY_TOTALS}\n```"),
    ]);
    let (resolver, _executor) = resolver_for(Arc::clone(&model)).await;

    let outcome = resolver
        .resolve("total orders last month", None)
        .await
        .expect("resolve");

    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.query, MONTHLY_TOTALS);
    assert_eq!(model.message_counts(), vec![2, 4, 6]);

    let third = model.messages_at(2);
    assert_eq!(third[2].role, Role::Assistant);
    assert_eq!(third[2].content, "I think you want the orders table.");
    assert_eq!(third[3].role, Role::User);
    assert_eq!(third[3].content, RETRY_INSTRUCTION);
    assert_eq!(third[4].content, "```sql\nSELECT * FROM Orders\n```");
    assert_eq!(third[5].content, RETRY_INSTRUCTION);
}

#[tokio::test]
async fn always_invalid_fails_after_ceiling_with_last_error() {
    let model = ScriptedModel::new((1..=MAX_ATTEMPTS).map(|i| format!("SELECT * FROM missing_{i}")));
    let (resolver, _executor) = resolver_for(Arc::clone(&model)).await;

    let err = resolver
        .resolve("total orders last month", None)
        .await
        .expect_err("unresolvable");

    match err {
        AppError::Query(msg) => assert!(
            msg.contains(&format!("missing_{MAX_ATTEMPTS}")),
            "expected error from final attempt, got {msg}"
        ),
        other => panic!("expected query error, got {other:?}"),
    }
    assert_eq!(model.calls(), 5);
    assert_eq!(model.message_counts(), vec![2, 4, 6, 8, 10]);
}

#[tokio::test]
async fn multi_statement_completion_is_retried_without_mutating() {
    let model = ScriptedModel::new([
        "```sql\nSELECT COUNT(*) AS \"n\" FROM \"OrderEntry\";\nDELETE FROM \"OrderEntry\";\n```".to_owned(),
        "```sql\nSELECT COUNT(*) AS \"n\" FROM \"OrderEntry\"\n```".to_owned(),
    ]);
    let (resolver, executor) = resolver_for(Arc::clone(&model)).await;

    let outcome = resolver.resolve("count order lines", None).await.expect("resolve");

    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.result[0]["n"], json!(8));
    assert_eq!(model.messages_at(1)[3].content, RETRY_INSTRUCTION);

    let remaining = executor
        .execute(r#"SELECT COUNT(*) AS "n" FROM "OrderEntry""#)
        .await
        .expect("count");
    assert_eq!(remaining[0]["n"], json!(8));
}

#[tokio::test]
async fn model_failure_is_not_retried() {
    let model = ScriptedModel::failing("rate limited");
    let (resolver, _executor) = resolver_for(Arc::clone(&model)).await;

    let err = resolver
        .resolve("total orders last month", None)
        .await
        .expect_err("model failure");

    assert!(matches!(err, AppError::Llm(msg) if msg.contains("rate limited")));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn model_settings_are_sent_with_each_request() {
    let model = ScriptedModel::new([MONTHLY_TOTALS]);
    let (resolver, _executor) = resolver_for(Arc::clone(&model)).await;
    let resolver = resolver.with_model_settings("gpt-4o-mini".into(), 0.5);

    resolver.resolve("orders", None).await.expect("resolve");

    let request = model.request_at(0);
    assert_eq!(request.model, "gpt-4o-mini");
    assert!((request.temperature - 0.5).abs() < f32::EPSILON);
}

#[tokio::test]
async fn steps_record_generations_and_outcome() {
    let temp = tempfile::tempdir().expect("tempdir");
    let writer = Arc::new(JsonlStepWriter::new(temp.path().to_owned()).expect("writer"));
    let model = ScriptedModel::new([
        "not sql".to_owned(),
        format!("```sql\n{MONTHLY_TOTALS}\n```"),
    ]);
    let (resolver, _executor) = resolver_for(model).await;
    let resolver = resolver.with_recorder(writer);
    let expected = columns(&["month", "total"]);

    resolver
        .resolve("total orders last month", Some(expected.as_slice()))
        .await
        .expect("resolve");

    let steps = read_steps(temp.path());
    assert_eq!(steps.len(), 3, "two generations and one tool step");

    let tool = steps
        .iter()
        .find(|s| s["name"] == "queryDatabase")
        .expect("tool step");
    assert_eq!(tool["type"], "tool");
    assert_eq!(tool["input"]["query"], "total orders last month");
    assert_eq!(tool["input"]["columnNames"], json!(["month", "total"]));
    assert_eq!(tool["output"]["attempts"], 2);
    assert_eq!(tool["output"]["query"], MONTHLY_TOTALS);

    let generations: Vec<_> = steps.iter().filter(|s| s["type"] == "llm").collect();
    assert_eq!(generations.len(), 2);
    for generation in generations {
        assert_eq!(generation["parent_id"], tool["id"]);
        assert_eq!(generation["generation"]["provider"], "scripted");
    }
}

#[tokio::test]
async fn failed_resolution_records_error_step() {
    let temp = tempfile::tempdir().expect("tempdir");
    let writer = Arc::new(JsonlStepWriter::new(temp.path().to_owned()).expect("writer"));
    let model = ScriptedModel::new(["SELEC nothing"]);
    let (resolver, _executor) = resolver_for(model).await;
    let resolver = resolver.with_recorder(writer);

    resolver.resolve("anything", None).await.expect_err("fails");

    let steps = read_steps(temp.path());
    assert_eq!(steps.len(), 6, "five generations and one tool step");
    let tool = steps
        .iter()
        .find(|s| s["name"] == "queryDatabase")
        .expect("tool step");
    assert!(tool["error"].as_str().expect("error text").starts_with("query:"));
    assert!(tool["output"].is_null());
}
