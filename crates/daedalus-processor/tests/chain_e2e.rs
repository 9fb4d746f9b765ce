//! End-to-end tests of assembly compilation and chain execution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use daedalus_processor::{
    Assembly, AssemblyError, Branch, Chain, Contexts, Contract, FnHandler, Handler, Key, Outcome,
    ProcessorError,
};

const INPUT: Key<String> = Key::new("request", "input");
const LENGTH: Key<usize> = Key::new("response", "length");
const LENGTH_AS_TEXT: Key<String> = Key::new("response", "length");
const TRACE: Key<Vec<String>> = Key::new("trace", "entries");
const HANDLED: Key<bool> = Key::new("response", "handled");

/// Appends an entry to the trace attribute.
fn trace(ctx: &mut Contexts, entry: &str) {
    if let Ok(entries) = ctx.get_or_insert_with(&TRACE, Vec::new) {
        entries.push(entry.to_string());
    }
}

/// A handler that only records its name.
fn marker(name: &'static str) -> impl Handler {
    FnHandler::new(name, Contract::new(), move |_, ctx| {
        trace(ctx, name);
        Ok(())
    })
}

/// Compiles and runs an assembly with an empty bag.
fn run(assembly: &Assembly) -> (Result<Outcome, ProcessorError>, Contexts) {
    let processing = Arc::new(assembly.create(&[]).unwrap());
    let mut ctx = processing.contexts();
    let result = Chain::new(&processing).process(&mut ctx);
    (result, ctx)
}

fn entries(ctx: &Contexts) -> Vec<String> {
    ctx.find(&TRACE).cloned().unwrap_or_default()
}

#[test]
fn test_unsatisfied_requirement_fails_to_compile() {
    let assembly = Assembly::new("broken").add(FnHandler::new(
        "measure",
        Contract::new().requires(&INPUT).defines(&LENGTH),
        |_, _| Ok(()),
    ));

    let error = assembly.create(&[]).unwrap_err();
    match error {
        AssemblyError::Unsatisfied {
            handler, attribute, ..
        } => {
            assert_eq!(handler, "measure");
            assert_eq!(attribute, "request.input");
        }
        other => panic!("unexpected {other}"),
    }

    assert!(assembly.create(&[INPUT.attribute()]).is_ok());
}

#[test]
fn test_conditional_definition_does_not_satisfy_requirement() {
    let assembly = Assembly::new("conditional")
        .add(FnHandler::new("maybe", Contract::new().defines_if(&LENGTH), |_, _| Ok(())))
        .add(FnHandler::new("needs", Contract::new().requires(&LENGTH), |_, _| Ok(())));
    assert!(matches!(
        assembly.create(&[]),
        Err(AssemblyError::Unsatisfied { handler: "needs", .. })
    ));

    let optional = Assembly::new("conditional")
        .add(FnHandler::new("maybe", Contract::new().defines_if(&LENGTH), |_, _| Ok(())))
        .add(FnHandler::new("reads", Contract::new().optional(&LENGTH), |_, _| Ok(())));
    assert!(optional.create(&[]).is_ok());
}

#[test]
fn test_conflicting_types_fail_to_compile() {
    let assembly = Assembly::new("conflict")
        .add(FnHandler::new("count", Contract::new().defines(&LENGTH), |_, _| Ok(())))
        .add(FnHandler::new("text", Contract::new().defines(&LENGTH_AS_TEXT), |_, _| Ok(())));
    assert!(matches!(
        assembly.create(&[]),
        Err(AssemblyError::Conflict { handler: "text", .. })
    ));
}

#[test]
fn test_before_and_after_anchors() {
    let assembly = Assembly::new("ordering")
        .add(marker("a"))
        .add(marker("d"))
        .add_after(marker("b"), "a")
        .add_before(marker("c"), "d")
        .add_after(marker("e"), "d");

    let (result, ctx) = run(&assembly);
    assert_eq!(result.unwrap(), Outcome::Completed);
    assert_eq!(entries(&ctx), ["a", "b", "c", "d", "e"]);
}

#[test]
fn test_unknown_anchor() {
    let assembly = Assembly::new("ordering").add_after(marker("b"), "missing");
    assert!(matches!(
        assembly.create(&[]),
        Err(AssemblyError::UnknownAnchor { .. })
    ));
}

#[test]
fn test_finalize_runs_once_in_reverse_on_error() {
    let finalized = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&finalized);
    let second = Arc::clone(&finalized);

    let assembly = Assembly::new("finalize")
        .add(FnHandler::new("first", Contract::new(), move |chain, _| {
            let sink = Arc::clone(&first);
            chain.on_finalize(move |_, outcome| sink.lock().unwrap().push(("first", outcome)));
            Ok(())
        }))
        .add(FnHandler::new("second", Contract::new(), move |chain, _| {
            let sink = Arc::clone(&second);
            chain.on_finalize(move |_, outcome| sink.lock().unwrap().push(("second", outcome)));
            Err(ProcessorError::failed("boom"))
        }))
        .add(marker("never"));

    let (result, ctx) = run(&assembly);
    let error = result.unwrap_err();
    assert_eq!(error.root().to_string(), "boom");
    assert!(matches!(error, ProcessorError::Handler { handler: "second", .. }));
    assert!(entries(&ctx).is_empty());
    assert_eq!(
        *finalized.lock().unwrap(),
        [("second", Outcome::Failed), ("first", Outcome::Failed)]
    );
}

#[test]
fn test_error_hook_handles_failure() {
    let assembly = Assembly::new("errors")
        .add(FnHandler::new(
            "guard",
            Contract::new().defines_if(&HANDLED),
            |chain, _| {
                chain.on_error(|ctx, error| {
                    ctx.set(&HANDLED, error.root().to_string() == "boom");
                    true
                });
                Ok(())
            },
        ))
        .add(FnHandler::new("fail", Contract::new(), |_, _| {
            Err(ProcessorError::failed("boom"))
        }));

    let (result, ctx) = run(&assembly);
    assert_eq!(result.unwrap(), Outcome::Failed);
    assert_eq!(ctx.find(&HANDLED), Some(&true));
}

#[test]
fn test_call_backs_run_only_on_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let assembly = Assembly::new("callbacks").add(FnHandler::new(
        "register",
        Contract::new(),
        move |chain, _| {
            let counter = Arc::clone(&counter);
            chain.call_back(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            Ok(())
        },
    ));
    let (result, _) = run(&assembly);
    assert_eq!(result.unwrap(), Outcome::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let failing = Assembly::new("callbacks")
        .add(FnHandler::new("register", Contract::new(), move |chain, _| {
            let counter = Arc::clone(&counter);
            chain.call_back(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            Ok(())
        }))
        .add(FnHandler::new("fail", Contract::new(), |_, _| {
            Err(ProcessorError::failed("boom"))
        }));
    let (result, _) = run(&failing);
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_skips_remaining() {
    let assembly = Assembly::new("cancel")
        .add(marker("a"))
        .add(FnHandler::new("stop", Contract::new(), |chain, ctx| {
            trace(ctx, "stop");
            chain.cancel();
            Ok(())
        }))
        .add(marker("b"));

    let (result, ctx) = run(&assembly);
    assert_eq!(result.unwrap(), Outcome::Cancelled);
    assert_eq!(entries(&ctx), ["a", "stop"]);
}

#[test]
fn test_route_replaces_remaining_steps() {
    let detour = Arc::new(
        Assembly::new("detour")
            .add(marker("x"))
            .add(marker("y"))
            .create(&[])
            .unwrap(),
    );
    let assembly = Assembly::new("main")
        .add(marker("a"))
        .add(FnHandler::new("switch", Contract::new(), move |chain, _| {
            chain.route(Arc::clone(&detour));
            Ok(())
        }))
        .add(marker("b"));

    let (result, ctx) = run(&assembly);
    assert_eq!(result.unwrap(), Outcome::Completed);
    assert_eq!(entries(&ctx), ["a", "x", "y"]);
}

struct Owner;

impl Handler for Owner {
    fn name(&self) -> &'static str {
        "owner"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&INPUT)
    }

    fn branches(&self) -> Vec<Branch> {
        vec![
            Branch::included(
                "measure",
                Assembly::new("measure").add(FnHandler::new(
                    "length",
                    Contract::new().requires(&INPUT).defines(&LENGTH),
                    |_, ctx| {
                        let length = ctx.get(&INPUT)?.len();
                        ctx.set(&LENGTH, length);
                        Ok(())
                    },
                )),
            ),
            Branch::using(
                "isolated",
                Assembly::new("isolated").add(FnHandler::new(
                    "isolated",
                    Contract::new(),
                    |_, ctx| {
                        trace(ctx, if ctx.contains(&INPUT) { "sees-input" } else { "isolated" });
                        Ok(())
                    },
                )),
                &["trace"],
            ),
            Branch::routing("tail", Assembly::new("tail").add(marker("tail"))),
        ]
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        chain.run_branch("measure", ctx)?;
        ctx.set(&TRACE, vec!["owner".to_string()]);
        chain.run_branch("isolated", ctx)?;
        chain.route_branch("tail")
    }
}

#[test]
fn test_branches() {
    let assembly = Assembly::new("branches")
        .add(Owner)
        .add(FnHandler::new("after", Contract::new().requires(&LENGTH), |_, _| Ok(())))
        .add(marker("skipped"));

    let processing = Arc::new(assembly.create(&[INPUT.attribute()]).unwrap());
    let mut ctx = processing.contexts();
    ctx.set(&INPUT, "hello".to_string());
    let outcome = Chain::new(&processing).process(&mut ctx).unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(ctx.find(&LENGTH), Some(&5));
    assert_eq!(entries(&ctx), ["owner", "isolated", "tail"]);
    assert!(ctx.contains(&INPUT));
    assert!(ctx.is_declared(&LENGTH));
}

#[test]
fn test_using_branch_only_sees_its_contexts() {
    struct Needy;

    impl Handler for Needy {
        fn name(&self) -> &'static str {
            "needy"
        }

        fn contract(&self) -> Contract {
            Contract::new()
        }

        fn branches(&self) -> Vec<Branch> {
            vec![Branch::using(
                "sub",
                Assembly::new("sub").add(FnHandler::new(
                    "reads-input",
                    Contract::new().requires(&INPUT),
                    |_, _| Ok(()),
                )),
                &["response"],
            )]
        }

        fn process(&self, _: &mut Chain, _: &mut Contexts) -> Result<(), ProcessorError> {
            Ok(())
        }
    }

    let error = Assembly::new("outer")
        .add(Needy)
        .create(&[INPUT.attribute()])
        .unwrap_err();
    match error {
        AssemblyError::Branch { branch, source, .. } => {
            assert_eq!(branch, "sub");
            assert!(matches!(*source, AssemblyError::Unsatisfied { .. }));
        }
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn test_report_lists_steps_and_contexts() {
    let processing = Assembly::new("report")
        .add(FnHandler::new(
            "measure",
            Contract::new().requires(&INPUT).defines(&LENGTH),
            |_, _| Ok(()),
        ))
        .create(&[INPUT.attribute()])
        .unwrap();
    let report = processing.report();
    assert!(report.contains("measure"));
    assert!(report.contains("request:"));
    assert!(report.contains("response:"));
}
