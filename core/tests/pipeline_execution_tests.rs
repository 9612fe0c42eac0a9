// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use shopflow::{Ctx, FlowError, Outcome, Pipeline, Step};

fn checkout_pipeline() -> Pipeline<OrderDraft, TestError> {
  Pipeline::with_steps(
    "checkout",
    &[("collect", false), ("price", false), ("confirm", false)],
  )
  .expect("step names are unique")
}

#[tokio::test]
async fn runs_steps_in_declared_order() {
  setup_tracing();
  let mut pipeline = checkout_pipeline();
  pipeline.on("collect", recording_handler("collect", 100)).unwrap();
  pipeline.on("price", recording_handler("price", 20)).unwrap();
  pipeline.on("confirm", recording_handler("confirm", 3)).unwrap();

  let ctx = Ctx::new(OrderDraft::default());
  let outcome = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, Outcome::Completed);
  let draft = ctx.read();
  assert_eq!(draft.trail, vec!["collect", "price", "confirm"]);
  assert_eq!(draft.total_cents, 123);
}

#[tokio::test]
async fn stop_signal_halts_remaining_steps() {
  setup_tracing();
  let mut pipeline = checkout_pipeline();
  pipeline.on("collect", recording_handler("collect", 1)).unwrap();
  pipeline.on("price", recording_handler("price", 1)).unwrap();
  pipeline.on("confirm", recording_handler("confirm", 1)).unwrap();

  let ctx = Ctx::new(OrderDraft {
    stop_at: Some("price".to_string()),
    ..Default::default()
  });
  let outcome = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, Outcome::Stopped);
  assert_eq!(ctx.read().trail, vec!["collect", "price"]);
}

#[tokio::test]
async fn handler_error_aborts_the_run() {
  setup_tracing();
  let mut pipeline = checkout_pipeline();
  pipeline.on("collect", recording_handler("collect", 1)).unwrap();
  pipeline.on("price", failing_handler("price", "no tariff")).unwrap();
  pipeline.on("confirm", recording_handler("confirm", 1)).unwrap();

  let ctx = Ctx::new(OrderDraft::default());
  let err = pipeline.run(ctx.clone()).await.unwrap_err();

  assert_eq!(err, TestError::Handler("no tariff".to_string()));
  assert_eq!(ctx.read().trail, vec!["collect", "price"]);
}

#[tokio::test]
async fn before_on_after_run_in_phase_order() {
  setup_tracing();
  let mut pipeline: Pipeline<OrderDraft, TestError> = Pipeline::with_steps("phases", &[("only", false)]).unwrap();
  pipeline.after("only", recording_handler("after", 0)).unwrap();
  pipeline.on("only", recording_handler("on", 0)).unwrap();
  pipeline.before("only", recording_handler("before", 0)).unwrap();

  let ctx = Ctx::new(OrderDraft::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().trail, vec!["before", "on", "after"]);
}

#[tokio::test]
async fn skip_condition_reads_the_context() {
  setup_tracing();
  let mut pipeline = checkout_pipeline();
  pipeline.on("collect", recording_handler("collect", 1)).unwrap();
  pipeline.on("price", recording_handler("price", 1)).unwrap();
  pipeline.on("confirm", recording_handler("confirm", 1)).unwrap();
  pipeline.skip_if("price", |draft: &OrderDraft| draft.express).unwrap();

  let ctx = Ctx::new(OrderDraft {
    express: true,
    ..Default::default()
  });
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().trail, vec!["collect", "confirm"]);
}

#[tokio::test]
async fn required_step_without_handlers_is_an_error() {
  setup_tracing();
  let mut pipeline = checkout_pipeline();
  pipeline.on("collect", recording_handler("collect", 1)).unwrap();
  pipeline.on("confirm", recording_handler("confirm", 1)).unwrap();

  let err = pipeline.run(Ctx::new(OrderDraft::default())).await.unwrap_err();

  match err {
    TestError::Flow(message) => assert!(message.contains("price"), "unexpected message: {message}"),
    other => panic!("expected a flow error, got {other:?}"),
  }
}

#[tokio::test]
async fn optional_steps_may_be_empty_or_fail() {
  setup_tracing();
  let mut pipeline: Pipeline<OrderDraft, TestError> = Pipeline::with_steps(
    "notify",
    &[("save", false), ("email", true), ("audit", true), ("done", false)],
  )
  .unwrap();
  pipeline.on("save", recording_handler("save", 1)).unwrap();
  pipeline.on("email", failing_handler("email", "smtp down")).unwrap();
  pipeline.on("done", recording_handler("done", 1)).unwrap();

  let ctx = Ctx::new(OrderDraft::default());
  let outcome = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, Outcome::Completed);
  assert_eq!(ctx.read().trail, vec!["save", "email", "done"]);
}

#[tokio::test]
async fn closures_and_async_blocks_are_accepted() {
  setup_tracing();
  let mut pipeline: Pipeline<OrderDraft, TestError> = Pipeline::new("closures");
  pipeline.add_step("add_line", false).unwrap();
  pipeline
    .on("add_line", |ctx: Ctx<OrderDraft>| async move {
      ctx.update(|draft| draft.lines.push("sku-1".to_string()));
      Ok::<_, TestError>(Step::Continue)
    })
    .unwrap();

  let ctx = Ctx::new(OrderDraft::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.snapshot().lines, vec!["sku-1"]);
}

#[test]
fn step_list_can_be_reshaped() {
  let mut pipeline = checkout_pipeline();
  pipeline.insert_before("collect", "authorize", false).unwrap();
  pipeline.insert_after("price", "discount", true).unwrap();
  assert!(pipeline.remove_step("confirm"));
  assert!(!pipeline.remove_step("confirm"));

  assert_eq!(pipeline.step_names(), vec!["authorize", "collect", "price", "discount"]);
}

#[test]
fn unknown_and_duplicate_steps_are_reported() {
  let mut pipeline = checkout_pipeline();

  let missing = pipeline.on("ship", recording_handler("ship", 0)).unwrap_err();
  assert!(matches!(missing, FlowError::StepNotFound { ref step, .. } if step == "ship"));

  let duplicate = pipeline.add_step("price", false).unwrap_err();
  assert!(matches!(duplicate, FlowError::DuplicateStep { ref step, .. } if step == "price"));
}
