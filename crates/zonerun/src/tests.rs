//! Tests for the Zone facade with a scripted native zone.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use zonepack::Codec;
use zonepack::Function;
use zonepack::JsonCodec;
use zonepack::SharedRef;
use zonepack::TransportContext;
use zonepack::Value;

use crate::mock_pool::Delivery;
use crate::mock_pool::StubZone;
use crate::pending::DROPPED_CODE;
use crate::*;

// ============================================================================
//  HELPERS
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Codec that counts how often it decodes.
#[derive(Default)]
struct CountingCodec {
    inner: JsonCodec,
    decodes: AtomicUsize,
}

impl Codec for CountingCodec {
    fn marshall(&self, value: &Value, context: &mut TransportContext) -> zonepack::Result<String> {
        self.inner.marshall(value, context)
    }

    fn unmarshall(&self, payload: &str, context: &TransportContext) -> zonepack::Result<Value> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        self.inner.unmarshall(payload, context)
    }
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

fn stub(response: ExecuteResponse) -> (Arc<StubZone>, Zone) {
    init_tracing();
    let native = StubZone::with_response("zone-1", response).into_arc();
    let zone = Zone::builder(native.clone())
        .registry(FunctionRegistry::new())
        .build();
    (native, zone)
}

// ============================================================================
//  EXECUTE
// ============================================================================

#[tokio::test]
async fn test_execute_resolves_value() {
    let (native, zone) = stub(ExecuteResponse::success("3", None));

    let result = zone
        .execute(Call::named("mod", "fn", ints(&[1, 2, 3]), 1000))
        .await
        .expect("execute failed");

    assert_eq!(result.payload(), "3");
    assert_eq!(result.value().unwrap(), &Value::Int(3));

    native.with_requests(|requests| {
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.module, "mod");
        assert_eq!(request.function, "fn");
        assert_eq!(request.arguments, vec!["1", "2", "3"]);
        assert_eq!(request.timeout, 1000);
        assert!(request.transport_context.is_empty());
    });
}

#[tokio::test]
async fn test_execute_rejects_with_native_message() {
    let (_native, zone) = stub(ExecuteResponse::failure(5, "boom"));

    let err = zone
        .execute(Call::named("mod", "fn", [], 0))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NativeExecutionFailure);
    assert!(err.to_string().contains("boom"));
    assert_eq!(err, Error::NativeExecutionFailure { code: 5, message: "boom".into() });
}

#[test]
fn test_execute_sync_matches_async() {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

    for response in [ExecuteResponse::success("[1,\"a\"]", None), ExecuteResponse::failure(7, "nope")] {
        let (_native, zone) = stub(response);
        let call = Call::named("m", "f", ints(&[1]), 0);

        let sync = zone.execute_sync(call.clone()).map(|r| r.into_value().unwrap());
        let asynch = runtime
            .block_on(zone.execute(call))
            .map(|r| r.into_value().unwrap());

        assert_eq!(sync, asynch);
    }
}

#[test]
fn test_invalid_first_argument_never_reaches_native() {
    let (native, _zone) = stub(ExecuteResponse::success("null", None));

    let err = Call::from_values(Value::Int(42), Value::Array(vec![]), Some(Value::Int(0)), None).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidArgumentShape);
    assert_eq!(native.request_count(), 0);
}

#[tokio::test]
async fn test_unsupported_argument_aborts_call() {
    let (native, zone) = stub(ExecuteResponse::success("null", None));
    let args = vec![Value::Int(1), Value::Float(f64::NAN)];

    let err = zone.execute(Call::named("m", "f", args.clone(), 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedValue);

    let err = zone.execute_sync(Call::named("m", "f", args, 0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedValue);

    assert_eq!(native.request_count(), 0);
}

#[tokio::test]
async fn test_function_call_uses_registry() {
    let (native, zone) = stub(ExecuteResponse::success("2", None));
    let f = Function::new("(a) => a + 1");

    let result = zone.execute(Call::function(f.clone(), ints(&[1]), 0)).await.unwrap();
    assert_eq!(result.value().unwrap(), &Value::Int(2));

    native.with_requests(|requests| {
        let request = &requests[0];
        assert_eq!(request.module, FUNCTION_MODULE);
        assert_eq!(zone.registry().get(&request.function), Some(f.clone()));
    });
}

#[tokio::test]
async fn test_function_calls_never_share_names() {
    let (native, zone) = stub(ExecuteResponse::success("null", None));
    let f = Function::new("() => null");

    zone.execute(Call::function(f.clone(), [], 0)).await.unwrap();
    zone.execute_sync(Call::function(f, [], 0)).unwrap();

    native.with_requests(|requests| {
        assert_ne!(requests[0].function, requests[1].function);
    });
}

#[tokio::test]
async fn test_shared_argument_is_registered() {
    let (native, zone) = stub(ExecuteResponse::success("null", None));
    let shared = SharedRef::new(vec![0u8; 1024]);
    let args = vec![Value::Shared(shared.clone()), Value::Shared(shared.clone())];

    zone.execute(Call::named("m", "f", args, 0)).await.unwrap();

    native.with_requests(|requests| {
        let request = &requests[0];
        assert_eq!(request.arguments, vec![r#"{"$shared":1}"#, r#"{"$shared":1}"#]);
        assert_eq!(request.transport_context.len(), 1);
        let resolved = request.transport_context.resolve(zonepack::Handle(1)).unwrap();
        assert!(resolved.ptr_eq(&shared));
    });
}

#[tokio::test]
async fn test_deferred_completion() {
    let (native, zone) = stub(ExecuteResponse::success("\"late\"", None));
    native.set_delivery(Delivery::Deferred);

    let result = zone.execute(Call::named("m", "f", [], 0)).await.unwrap();
    assert_eq!(result.value().unwrap(), &Value::from("late"));
}

#[tokio::test]
async fn test_dropped_completion() {
    let (native, zone) = stub(ExecuteResponse::success("1", None));
    native.set_delivery(Delivery::Dropped);

    let err = zone.execute(Call::named("m", "f", [], 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NativeExecutionFailure);
    assert!(matches!(err, Error::NativeExecutionFailure { code: DROPPED_CODE, .. }));
}

// ============================================================================
//  RESULTS
// ============================================================================

#[tokio::test]
async fn test_value_decodes_once() {
    init_tracing();
    let native = StubZone::with_response("z", ExecuteResponse::success("{\"a\":[1,2]}", None)).into_arc();
    let codec = Arc::new(CountingCodec::default());
    let zone = Zone::builder(native).codec(codec.clone()).build();

    let result = zone.execute(Call::named("m", "f", [], 0)).await.unwrap();
    assert_eq!(codec.decodes.load(Ordering::SeqCst), 0);

    let first = result.value().unwrap().clone();
    let second = result.value().unwrap().clone();

    assert_eq!(first, second);
    assert_eq!(codec.decodes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_decode_is_cached() {
    let codec = Arc::new(CountingCodec::default());
    let result = ExecuteResult::new("{broken", TransportContext::new(), codec.clone());

    let first = result.value().unwrap_err();
    let second = result.value().unwrap_err();

    assert_eq!(first.kind(), ErrorKind::MalformedPayload);
    assert_eq!(first, second);
    assert_eq!(codec.decodes.load(Ordering::SeqCst), 1);
    assert_eq!(result.payload(), "{broken");
}

#[test]
fn test_unknown_handle_in_result() {
    let (_native, zone) = stub(ExecuteResponse::success(r#"{"$shared":3}"#, None));
    let result = zone.execute_sync(Call::named("m", "f", [], 0)).unwrap();

    assert_eq!(result.value().unwrap_err().kind(), ErrorKind::UnknownHandle);
}

#[test]
fn test_result_resolves_returned_handles() {
    let shared = SharedRef::new(String::from("big"));
    let mut respondent = TransportContext::new();
    let payload = zonepack::marshall(&Value::Shared(shared.clone()), &mut respondent).unwrap();

    let (_native, zone) = stub(ExecuteResponse::success(payload, Some(respondent.into_handle())));
    let value = zone.execute_sync(Call::named("m", "f", [], 0)).unwrap().into_value().unwrap();

    assert!(value.as_shared().unwrap().ptr_eq(&shared));
}

// ============================================================================
//  BROADCAST
// ============================================================================

#[tokio::test]
async fn test_broadcast_function_source() {
    let (native, zone) = stub(ExecuteResponse::success("null", None));

    zone.broadcast(Broadcast::function(Function::new("x => x+1"), [Value::Int(41)]))
        .await
        .unwrap();

    assert_eq!(native.sources(), vec!["(x => x+1)(41)"]);
}

#[tokio::test]
async fn test_broadcast_failure_code() {
    let (native, zone) = stub(ExecuteResponse::success("null", None));
    native.set_broadcast_code(3);

    let err = zone.broadcast(Broadcast::source("boom()")).await.unwrap_err();
    assert_eq!(err.to_string(), "broadcast failed with response code: 3");

    let sync_err = zone.broadcast_sync(Broadcast::source("boom()")).unwrap_err();
    assert_eq!(err, sync_err);
}

#[tokio::test]
async fn test_broadcast_rejects_shared_arguments() {
    let (native, zone) = stub(ExecuteResponse::success("null", None));
    let b = Broadcast::function(Function::new("(b) => b"), [Value::Shared(SharedRef::new(1u8))]);

    let err = zone.broadcast(b.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
    assert_eq!(zone.broadcast_sync(b).unwrap_err().kind(), ErrorKind::UnsupportedValue);
    assert!(native.sources().is_empty());
}

#[tokio::test]
async fn test_broadcast_follows_zone_depth() {
    init_tracing();
    let native = StubZone::with_response("z", ExecuteResponse::success("null", None)).into_arc();
    let zone = Zone::builder(native.clone()).max_depth(1).build();
    let b = Broadcast::function(Function::new("(a) => a"), [Value::Array(vec![Value::Array(vec![Value::Int(1)])])]);

    let err = zone.broadcast(b.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
    assert_eq!(zone.broadcast_sync(b).unwrap_err().kind(), ErrorKind::UnsupportedValue);
    assert!(native.sources().is_empty());

    zone.broadcast(Broadcast::function(Function::new("(a) => a"), [Value::Array(vec![Value::Int(1)])]))
        .await
        .unwrap();
    assert_eq!(native.sources(), vec!["((a) => a)([1])"]);
}

// ============================================================================
//  IDENTITY
// ============================================================================

#[test]
fn test_descriptor() {
    let (_native, zone) = stub(ExecuteResponse::success("null", None));

    assert_eq!(zone.id(), "zone-1");
    assert_eq!(
        serde_json::to_string(&zone).unwrap(),
        r#"{"id":"zone-1","type":"isolate"}"#
    );
    assert_eq!(zone.descriptor().kind, ZoneKind::Isolate);
}
