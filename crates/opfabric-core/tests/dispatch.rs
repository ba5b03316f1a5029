//! End-to-end dispatch scenarios: registration, lookup, retry, and policy.
//!
//! Each test here is a direct port of one `KernelTestCase` scenario from the
//! `bubbles` Python source this kernel was distilled from, reworked as
//! idiomatic `#[test]` functions rather than a literal translation.

use std::any::Any;
use std::sync::Arc;
use std::sync::Mutex;

use opfabric_core::{
    common_representations, operation, DataObject, DispatchError, ErrorKind, Operand,
    OperationBuilder, OperationContext, Outcome, RepresentationToken, Signature, Value,
};
use pretty_assertions::assert_eq;

/// A bare-bones data object carrying whatever representations a test wants
/// and a piece of mutable state operations can thread through.
struct DummyObject {
    reps: Vec<&'static str>,
    data: Mutex<String>,
}

impl DummyObject {
    fn new(reps: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            reps: reps.to_vec(),
            data: Mutex::new(String::new()),
        })
    }

    fn with_data(reps: &[&'static str], data: &str) -> Arc<Self> {
        Arc::new(Self {
            reps: reps.to_vec(),
            data: Mutex::new(data.to_string()),
        })
    }

    fn data(&self) -> String {
        self.data.lock().unwrap().clone()
    }

    fn push(&self, suffix: &str) {
        self.data.lock().unwrap().push_str(suffix);
    }
}

impl DataObject for DummyObject {
    fn representations(&self) -> Vec<RepresentationToken> {
        self.reps.iter().map(|s| RepresentationToken::parse(s).unwrap()).collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn single(obj: &Arc<DummyObject>) -> Operand {
    Operand::Single(obj.clone())
}

/// Recover the concrete `DummyObject` behind an operand's type-erased
/// `Arc<dyn DataObject>` so a test operation can read/mutate its data field.
fn as_dummy(obj: &Arc<dyn DataObject>) -> &DummyObject {
    obj.as_any().downcast_ref::<DummyObject>().expect("operand is a DummyObject")
}

fn sig(tokens: &[&str]) -> Signature {
    Signature::new(tokens.iter().copied()).unwrap()
}

#[test]
fn duplicate_registration_is_an_argument_error() {
    let mut ctx = OperationContext::new();
    let build = |name: &str| {
        OperationBuilder::new(name, Arc::new(|_c: &mut OperationContext, _o: &[Value], _p: &[Value]| Ok(Outcome::Done(Value::Null))))
            .operands(["obj"])
            .build(sig(&["sql"]))
            .unwrap()
    };

    ctx.add_operation(build("func")).unwrap();
    let err = ctx.add_operation(build("func")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert!(matches!(err, DispatchError::DuplicateSignature { .. }));
}

#[test]
fn dispatch_prefers_concrete_signature_over_wildcard_fallback() {
    let mut ctx = OperationContext::new();
    let specific = OperationBuilder::new(
        "unary",
        Arc::new(|_c: &mut OperationContext, _o: &[Value], _p: &[Value]| Ok(Outcome::Done(Value::from("specific")))),
    )
    .operands(["obj"])
    .build(sig(&["sql"]))
    .unwrap();
    let wildcard = OperationBuilder::new(
        "unary",
        Arc::new(|_c: &mut OperationContext, _o: &[Value], _p: &[Value]| Ok(Outcome::Done(Value::from("default")))),
    )
    .operands(["obj"])
    .build(sig(&["*"]))
    .unwrap();

    ctx.add_operation(specific).unwrap();
    ctx.add_operation(wildcard).unwrap();

    let obj_sql = DummyObject::new(&["sql"]);
    let found = ctx.lookup_operation("unary", &[single(&obj_sql)]).unwrap();
    assert_eq!(found.signature(), &sig(&["sql"]));

    let obj_rows = DummyObject::new(&["rows"]);
    let found = ctx.lookup_operation("unary", &[single(&obj_rows)]).unwrap();
    assert_eq!(found.signature(), &sig(&["*"]));

    let err = ctx
        .lookup_operation("unary", &[single(&obj_sql), single(&obj_sql)])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Operation);
}

#[test]
fn priority_is_independent_of_registration_order() {
    fn build(name: &str, tok: &str, tag: &'static str) -> opfabric_core::Operation {
        OperationBuilder::new(name, Arc::new(move |_c: &mut OperationContext, _o: &[Value], _p: &[Value]| Ok(Outcome::Done(Value::from(tag)))))
            .operands(["obj"])
            .build(sig(&[tok]))
            .unwrap()
    }

    let obj_sql = DummyObject::new(&["sql", "rows"]);
    let obj_rows = DummyObject::new(&["rows", "sql"]);

    let mut forward = OperationContext::new();
    forward.add_operation(build("meditate", "sql", "fsql")).unwrap();
    forward.add_operation(build("meditate", "rows", "frows")).unwrap();
    assert_eq!(
        forward.lookup_operation("meditate", &[single(&obj_sql)]).unwrap().signature(),
        &sig(&["sql"])
    );
    assert_eq!(
        forward.lookup_operation("meditate", &[single(&obj_rows)]).unwrap().signature(),
        &sig(&["rows"])
    );

    let mut reverse = OperationContext::new();
    reverse.add_operation(build("meditate", "rows", "frows")).unwrap();
    reverse.add_operation(build("meditate", "sql", "fsql")).unwrap();
    assert_eq!(
        reverse.lookup_operation("meditate", &[single(&obj_sql)]).unwrap().signature(),
        &sig(&["sql"])
    );
    assert_eq!(
        reverse.lookup_operation("meditate", &[single(&obj_rows)]).unwrap().signature(),
        &sig(&["rows"])
    );
}

#[test]
fn retry_chain_falls_back_from_sql_to_rows() {
    let mut ctx = OperationContext::new();

    let join_sql = operation(
        "join",
        Arc::new(|_c: &mut OperationContext, operands: &[Value], _p: &[Value]| {
            let l = match &operands[0] {
                Value::Object(o) => o.clone(),
                _ => unreachable!(),
            };
            let r = match &operands[1] {
                Value::Object(o) => o.clone(),
                _ => unreachable!(),
            };
            let l = as_dummy(&l);
            let r = as_dummy(&r);
            if l.data() == r.data() {
                Ok(Outcome::Done(Value::from("SQL")))
            } else {
                Ok(Outcome::Retry(vec!["sql".into(), "rows".into()]))
            }
        }),
    )
    .operands(["l", "r"])
    .build(sig(&["sql", "sql"]))
    .unwrap();

    let join_iter = operation(
        "join",
        Arc::new(|_c: &mut OperationContext, _operands: &[Value], _p: &[Value]| Ok(Outcome::Done(Value::from("ITERATOR")))),
    )
    .operands(["l", "r"])
    .build(sig(&["sql", "rows"]))
    .unwrap();

    ctx.add_operation(join_sql).unwrap();
    ctx.add_operation(join_iter).unwrap();

    let local = DummyObject::with_data(&["sql", "rows"], "local");
    let remote = DummyObject::with_data(&["sql", "rows"], "remote");

    let result = ctx
        .o("join")
        .call(&[Value::Object(local.clone()), Value::Object(local.clone())], &[])
        .unwrap();
    assert_eq!(result.as_text(), Some("SQL"));

    let result = ctx
        .o("join")
        .call(&[Value::Object(local), Value::Object(remote)], &[])
        .unwrap();
    assert_eq!(result.as_text(), Some("ITERATOR"));
}

#[test]
fn retry_that_never_settles_hits_the_cycle_guard() {
    let mut ctx = OperationContext::new();
    let endless = operation(
        "endless",
        Arc::new(|_c: &mut OperationContext, _o: &[Value], _p: &[Value]| Ok(Outcome::Retry(vec!["sql".into(), "sql".into()]))),
    )
    .operands(["l", "r"])
    .build(sig(&["sql", "sql"]))
    .unwrap();
    ctx.add_operation(endless).unwrap();

    let local = DummyObject::with_data(&["sql", "rows"], "local");
    let err = ctx
        .o("endless")
        .call(&[Value::Object(local.clone()), Value::Object(local)], &[])
        .unwrap_err();
    let dispatch_err = err.downcast_ref::<DispatchError>().expect("kernel error");
    assert_eq!(dispatch_err.kind(), ErrorKind::Retry);
    assert!(matches!(dispatch_err, DispatchError::RetryLoop { .. }));
}

#[test]
fn nested_retry_composes_with_an_independent_cycle_guard() {
    let mut ctx = OperationContext::new();

    let aggregate_sql = operation(
        "aggregate",
        Arc::new(|_c: &mut OperationContext, operands: &[Value], params: &[Value]| {
            let fail = matches!(params.first(), Some(Value::Bool(true)));
            let obj = match &operands[0] {
                Value::Object(o) => o.clone(),
                _ => unreachable!(),
            };
            if fail {
                Ok(Outcome::Retry(vec!["rows".into()]))
            } else {
                as_dummy(&obj).push("-SQL-");
                Ok(Outcome::Done(Value::Object(obj)))
            }
        }),
    )
    .operands(["obj"])
    .parameters(["fail"])
    .build(sig(&["sql"]))
    .unwrap();

    let aggregate_rows = operation(
        "aggregate",
        Arc::new(|_c: &mut OperationContext, operands: &[Value], _params: &[Value]| {
            let obj = match &operands[0] {
                Value::Object(o) => o.clone(),
                _ => unreachable!(),
            };
            as_dummy(&obj).push("-ROWS-");
            Ok(Outcome::Done(Value::Object(obj)))
        }),
    )
    .operands(["obj"])
    .parameters(["fail"])
    .build(sig(&["rows"]))
    .unwrap();

    let window_aggregate = operation(
        "window_aggregate",
        Arc::new(|ctx: &mut OperationContext, operands: &[Value], params: &[Value]| {
            let obj = match &operands[0] {
                Value::Object(o) => o.clone(),
                _ => unreachable!(),
            };
            as_dummy(&obj).push("START");
            ctx.o("aggregate")
                .call(&[Value::Object(obj.clone())], &[params[0].clone()])?;
            as_dummy(&obj).push("END");
            Ok(Outcome::Done(Value::Object(obj)))
        }),
    )
    .operands(["obj"])
    .parameters(["fail"])
    .build(sig(&["sql"]))
    .unwrap();

    ctx.add_operation(aggregate_sql).unwrap();
    ctx.add_operation(aggregate_rows).unwrap();
    ctx.add_operation(window_aggregate).unwrap();

    let obj = DummyObject::new(&["sql"]);
    ctx.o("window_aggregate")
        .call(&[Value::Object(obj.clone())], &[Value::Bool(true)])
        .unwrap();
    assert_eq!(obj.data(), "START-ROWS-END");

    let obj = DummyObject::new(&["sql"]);
    ctx.o("window_aggregate")
        .call(&[Value::Object(obj.clone())], &[Value::Bool(false)])
        .unwrap();
    assert_eq!(obj.data(), "START-SQL-END");
}

#[test]
fn retry_allow_and_deny_policy() {
    fn build_ctx() -> (OperationContext, Arc<DummyObject>) {
        let mut ctx = OperationContext::new();
        let swim = operation(
            "swim",
            Arc::new(|_c: &mut OperationContext, _o: &[Value], _p: &[Value]| Ok(Outcome::Retry(vec!["rows".into()]))),
        )
        .operands(["obj"])
        .build(sig(&["sql"]))
        .unwrap();
        let swim_rows = operation(
            "swim",
            Arc::new(|_c: &mut OperationContext, operands: &[Value], _p: &[Value]| {
                let obj = match &operands[0] {
                    Value::Object(o) => o.clone(),
                    _ => unreachable!(),
                };
                as_dummy(&obj).push("good");
                Ok(Outcome::Done(Value::Object(obj)))
            }),
        )
        .operands(["obj"])
        .build(sig(&["rows"]))
        .unwrap();
        ctx.add_operation(swim).unwrap();
        ctx.add_operation(swim_rows).unwrap();
        let obj = DummyObject::new(&["sql", "rows"]);
        (ctx, obj)
    }

    let (mut ctx, obj) = build_ctx();
    ctx.op("swim").call(&[Value::Object(obj.clone())], &[]).unwrap();
    assert_eq!(obj.data(), "good");

    let (mut ctx, obj) = build_ctx();
    ctx.retry_deny.insert("swim".to_string());
    let err = ctx.op("swim").call(&[Value::Object(obj)], &[]).unwrap_err();
    assert_eq!(err.downcast_ref::<DispatchError>().unwrap().kind(), ErrorKind::Retry);

    let (mut ctx, obj) = build_ctx();
    ctx.retry_allow.insert("swim".to_string());
    ctx.op("swim").call(&[Value::Object(obj.clone())], &[]).unwrap();
    assert_eq!(obj.data(), "good");

    let (mut ctx, obj) = build_ctx();
    ctx.retry_deny.insert("swim".to_string());
    ctx.retry_allow.insert("swim".to_string());
    let err = ctx.op("swim").call(&[Value::Object(obj)], &[]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<DispatchError>().unwrap().kind(),
        ErrorKind::Retry,
        "deny takes precedence over allow"
    );
}

#[test]
fn operation_prototype_reports_operand_and_parameter_names() {
    let mut ctx = OperationContext::new();
    let join = OperationBuilder::new(
        "join",
        Arc::new(|_c: &mut OperationContext, _o: &[Value], _p: &[Value]| Ok(Outcome::Done(Value::Null))),
    )
    .operands(["master", "detail"])
    .parameters(["master_key", "detail_key"])
    .build(sig(&["rows", "rows"]))
    .unwrap();
    ctx.add_operation(join).unwrap();

    let proto = ctx.operation_prototype("join").unwrap();
    assert_eq!(proto.operand_count, 2);
    assert_eq!(proto.operands, vec!["master".to_string(), "detail".to_string()]);
    assert_eq!(proto.parameters, vec!["master_key".to_string(), "detail_key".to_string()]);
}

#[test]
fn remove_by_signature_falls_back_to_remaining_bucket() {
    let mut ctx = OperationContext::new();
    let specific = OperationBuilder::new(
        "unary",
        Arc::new(|_c: &mut OperationContext, _o: &[Value], _p: &[Value]| Ok(Outcome::Done(Value::from("specific")))),
    )
    .operands(["obj"])
    .build(sig(&["rows"]))
    .unwrap();
    let wildcard = OperationBuilder::new(
        "unary",
        Arc::new(|_c: &mut OperationContext, _o: &[Value], _p: &[Value]| Ok(Outcome::Done(Value::from("default")))),
    )
    .operands(["obj"])
    .build(sig(&["*"]))
    .unwrap();
    ctx.add_operation(specific).unwrap();
    ctx.add_operation(wildcard).unwrap();

    let obj = DummyObject::new(&["rows"]);
    let found = ctx.lookup_operation("unary", &[single(&obj)]).unwrap();
    assert_eq!(found.signature(), &sig(&["rows"]));

    ctx.remove_operation("unary", Some(&sig(&["rows"]))).unwrap();
    let found = ctx.lookup_operation("unary", &[single(&obj)]).unwrap();
    assert_eq!(found.signature(), &sig(&["*"]));

    ctx.remove_operation("unary", None).unwrap();
    let err = ctx.lookup_operation("unary", &[single(&obj)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Operation);
}

#[test]
fn list_shaped_operand_dispatches_against_the_list_suffixed_bucket() {
    let mut ctx = OperationContext::new();
    let scalar = OperationBuilder::new(
        "describe",
        Arc::new(|_c: &mut OperationContext, _o: &[Value], _p: &[Value]| Ok(Outcome::Done(Value::from("one")))),
    )
    .operands(["obj"])
    .build(sig(&["sql"]))
    .unwrap();
    let list = OperationBuilder::new(
        "describe",
        Arc::new(|_c: &mut OperationContext, _o: &[Value], _p: &[Value]| Ok(Outcome::Done(Value::from("many")))),
    )
    .operands(["objs"])
    .build(sig(&["sql[]"]))
    .unwrap();
    ctx.add_operation(scalar).unwrap();
    ctx.add_operation(list).unwrap();

    let single = DummyObject::new(&["sql"]);
    let result = ctx.o("describe").call(&[Value::Object(single)], &[]).unwrap();
    assert_eq!(result.as_text(), Some("one"));

    let objs: Vec<Arc<dyn DataObject>> = vec![DummyObject::new(&["sql", "rows"])];
    let result = ctx
        .o("describe")
        .call(&[Value::ObjectList(objs)], &[])
        .unwrap();
    assert_eq!(result.as_text(), Some("many"));
}

#[test]
fn list_shaped_operand_falls_back_to_wildcard_list_bucket() {
    let mut ctx = OperationContext::new();
    let wildcard_list = OperationBuilder::new(
        "tally",
        Arc::new(|_c: &mut OperationContext, operands: &[Value], _p: &[Value]| {
            let count = match &operands[0] {
                Value::ObjectList(objs) => objs.len() as i64,
                _ => unreachable!(),
            };
            Ok(Outcome::Done(Value::Int(count)))
        }),
    )
    .operands(["objs"])
    .build(sig(&["*[]"]))
    .unwrap();
    ctx.add_operation(wildcard_list).unwrap();

    let objs: Vec<Arc<dyn DataObject>> =
        vec![DummyObject::new(&["text"]), DummyObject::new(&["text"])];
    let result = ctx
        .o("tally")
        .call(&[Value::ObjectList(objs)], &[])
        .unwrap();
    assert!(matches!(result, Value::Int(2)));

    // A scalar operand against a name only registered for `*[]` has no
    // matching bucket shape.
    let err = ctx
        .lookup_operation("tally", &[single(&DummyObject::new(&["text"]))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Operation);
}

#[test]
fn common_representations_across_objects() {
    let a = DummyObject::new(&["a", "b", "c"]);
    let b = DummyObject::new(&["a", "b", "d"]);
    let c = DummyObject::new(&["b", "d", "e"]);
    let objs: Vec<&dyn DataObject> = vec![a.as_ref(), b.as_ref(), c.as_ref()];
    let common: Vec<String> = common_representations(&objs).iter().map(ToString::to_string).collect();
    assert_eq!(common, vec!["b".to_string()]);

    let c2 = DummyObject::new(&["d", "d", "e"]);
    let objs: Vec<&dyn DataObject> = vec![a.as_ref(), b.as_ref(), c2.as_ref()];
    assert!(common_representations(&objs).is_empty());
}
