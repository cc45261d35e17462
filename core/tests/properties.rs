//! Property and concurrency checks for the subtask client.
//!
//! The proptest cases drive `Subtasks::create` through a scripted transport
//! on a fresh current-thread runtime per case. The concurrency tests fire
//! many overlapping calls with randomized latency and check that every
//! result settles with its own response.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use rand::Rng;
use serde_json::{json, Value};
use taskapi_core::{
    ApiConfig, ApiError, AsyncResult, CorrelationId, HttpResponse, Payload, RecordingTransport,
    ResourceClient, Revision, Subtask, Subtasks,
};
use tokio::runtime::{Builder, Handle};

fn runtime() -> tokio::runtime::Runtime {
    Builder::new_current_thread().enable_all().build().unwrap()
}

fn build_payload(task_id: Option<u64>, title: Option<String>, completed: Option<bool>) -> Payload {
    let mut payload = Payload::new();
    if let Some(task_id) = task_id {
        payload.insert("task_id".to_string(), json!(task_id));
    }
    if let Some(title) = title {
        payload.insert("title".to_string(), json!(title));
    }
    if let Some(completed) = completed {
        payload.insert("completed".to_string(), json!(completed));
    }
    payload
}

/// Responds to a create with `status`, echoing the sent fields on success.
fn create_responder(status: u16) -> RecordingTransport {
    RecordingTransport::new(move |request| {
        if status == 201 {
            let mut body: Value = serde_json::from_str(request.body.as_deref().unwrap_or("{}"))
                .unwrap_or_else(|_| json!({}));
            body["id"] = json!(1);
            body["revision"] = json!(1);
            Ok(HttpResponse::new(201, body.to_string()))
        } else {
            Ok(HttpResponse::new(status, r#"{"errors":["rejected upstream"]}"#))
        }
    })
}

fn subtasks(transport: RecordingTransport) -> Subtasks<RecordingTransport> {
    Subtasks::new(
        &ApiConfig::default(),
        Arc::new(transport),
        Handle::current(),
    )
}

proptest! {
    #[test]
    fn incomplete_payloads_never_reach_the_transport(
        task_id in proptest::option::of(any::<u64>()),
        title in proptest::option::of("[a-zA-Z ]{0,40}"),
        completed in proptest::option::of(any::<bool>()),
    ) {
        prop_assume!(task_id.is_none() || title.is_none());
        let payload = build_payload(task_id, title, completed);

        let (outcome, calls) = runtime().block_on(async {
            let api = subtasks(create_responder(201));
            let outcome = api.create(&payload, None).await;
            (outcome, api.client().transport().call_count())
        });

        let err = outcome.unwrap_err();
        prop_assert!(matches!(err, ApiError::Validation(_)));
        prop_assert_eq!(err.status(), 0);
        prop_assert_eq!(err.errors().len(), 1);
        prop_assert_eq!(calls, 0);
    }

    #[test]
    fn valid_payloads_make_exactly_one_call(
        task_id in any::<u64>(),
        title in "[a-zA-Z ]{0,40}",
        completed in proptest::option::of(any::<bool>()),
        status in prop_oneof![Just(201u16), Just(404u16), Just(409u16), Just(422u16), Just(500u16)],
    ) {
        let payload = build_payload(Some(task_id), Some(title.clone()), completed);

        let (outcome, calls) = runtime().block_on(async {
            let api = subtasks(create_responder(status));
            let outcome = api.create(&payload, None).await;
            (outcome, api.client().transport().call_count())
        });

        prop_assert_eq!(calls, 1);
        match outcome {
            Ok(response) => {
                prop_assert_eq!(status, 201);
                prop_assert_eq!(response.status, 201);
                prop_assert_eq!(response.payload.id, 1);
                prop_assert_eq!(response.payload.revision, Revision(1));
                prop_assert_eq!(response.payload.task_id, task_id);
                prop_assert_eq!(response.payload.title, title);
                prop_assert_eq!(response.payload.completed, completed.unwrap_or(false));
            }
            Err(err) => {
                prop_assert_eq!(err.status(), status);
                prop_assert!(!err.is_local());
                prop_assert_eq!(err.errors(), vec!["rejected upstream".to_string()]);
            }
        }
    }
}

#[tokio::test]
async fn callbacks_fire_once_per_registration() {
    let api = subtasks(RecordingTransport::fixed(404, r#"{"errors":["missing"]}"#));
    let done = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let always = Arc::new(AtomicUsize::new(0));

    let result = api.get_by_id(1, None);
    let register = |result: &AsyncResult<Subtask>| {
        let (d, f, a) = (Arc::clone(&done), Arc::clone(&failed), Arc::clone(&always));
        result
            .done(move |_| {
                d.fetch_add(1, Ordering::SeqCst);
            })
            .fail(move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .always(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            });
    };

    // before and after settlement
    register(&result);
    let err = result.clone().await.unwrap_err();
    register(&result);

    assert_eq!(err.status(), 404);
    assert_eq!(done.load(Ordering::SeqCst), 0);
    assert_eq!(failed.load(Ordering::SeqCst), 2);
    assert_eq!(always.load(Ordering::SeqCst), 2);
}

const CONCURRENT_CALLS: u64 = 32;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_settle_with_their_own_response() {
    let latencies: Vec<u64> = {
        let mut rng = rand::rng();
        (0..CONCURRENT_CALLS).map(|_| rng.random_range(0..25)).collect()
    };

    let transport = RecordingTransport::new(|request| {
        let id: u64 = request.path.rsplit('/').next().unwrap().parse().unwrap();
        let correlation = request.header("x-client-request-id").unwrap_or_default();
        let body = json!({ "id": id, "correlation": correlation });
        Ok(HttpResponse::new(200, body.to_string()))
    })
    .with_latency(move |request| {
        let id: usize = request.path.rsplit('/').next().unwrap().parse().unwrap();
        Duration::from_millis(latencies[id])
    });

    let client: ResourceClient<Value, _> = ResourceClient::new(
        ApiConfig::default().resource("subtasks", "subtask"),
        Arc::new(transport),
        Handle::current(),
    );

    let pending: Vec<_> = (0..CONCURRENT_CALLS)
        .map(|id| {
            let cid = CorrelationId::new(format!("call-{id}"));
            (id, client.get_by_id(id, Some(cid)))
        })
        .collect();

    for (id, result) in pending {
        let response = result.await.unwrap();
        assert_eq!(response.payload["id"], id);
        assert_eq!(response.payload["correlation"], format!("call-{id}"));
    }
    assert_eq!(client.transport().call_count(), CONCURRENT_CALLS as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_outcomes_do_not_cross() {
    // even ids succeed, odd ids are missing
    let transport = RecordingTransport::new(|request| {
        let id: u64 = request.path.rsplit('/').next().unwrap().parse().unwrap();
        if id % 2 == 0 {
            Ok(HttpResponse::new(200, json!({ "id": id }).to_string()))
        } else {
            Ok(HttpResponse::new(404, json!({ "errors": [format!("{id} missing")] }).to_string()))
        }
    })
    .with_latency(|request| {
        let id: u64 = request.path.rsplit('/').next().unwrap().parse().unwrap();
        Duration::from_millis((CONCURRENT_CALLS - id) % 7)
    });

    let client: ResourceClient<Value, _> = ResourceClient::new(
        ApiConfig::default().resource("subtasks", "subtask"),
        Arc::new(transport),
        Handle::current(),
    );

    let pending: Vec<_> = (0..CONCURRENT_CALLS)
        .map(|id| (id, client.get_by_id(id, None)))
        .collect();

    for (id, result) in pending {
        match result.await {
            Ok(response) => {
                assert_eq!(id % 2, 0);
                assert_eq!(response.payload["id"], id);
            }
            Err(err) => {
                assert_eq!(id % 2, 1);
                assert_eq!(err.errors(), vec![format!("{id} missing")]);
            }
        }
    }
}
