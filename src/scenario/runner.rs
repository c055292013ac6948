//! Executes scenarios against a live surrogate.
//!
//! A run has three stages: arm the expectations, make the calls, verify. The first
//! error ends the run and is then judged against the scenario's asserted outcome, so a
//! scenario can assert a configuration error just as well as a verification failure.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use super::literal::{arg_spec, literal};
use super::{CallDef, ExpectationDef, ExpectationKind, Outcome, Scenario, VerifyMode};
use crate::method::{format_call, MethodSig, Param, PassingMode};
use crate::surrogate::{Call, Surrogate, SurrogateOptions};
use crate::value::{numeric, Value, ValueKind};
use crate::verify::VerificationReport;
use crate::{err_ctx, DecoyError};

/// The judged result of one scenario.
#[derive(Debug, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub passed: bool,
    /// Why the scenario failed, or the expected failure it produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<VerificationReport>,
    /// The error that failed the scenario, kept for rich rendering.
    #[serde(skip)]
    pub error: Option<DecoyError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Arm expectations only.
    Check,
    /// Arm, call, verify.
    Run,
}

/// Runs every stage of `scenario` and judges the result.
pub fn run_scenario(scenario: &Scenario) -> ScenarioOutcome {
    execute(scenario, Stage::Run)
}

/// Arms the expectations without making any call. Setup errors are judged like in a
/// full run.
pub fn check_scenario(scenario: &Scenario) -> ScenarioOutcome {
    execute(scenario, Stage::Check)
}

/// Loads and runs a scenario file. Only loading errors are returned as `Err`.
pub fn run_file(path: impl AsRef<Path>) -> Result<ScenarioOutcome, DecoyError> {
    let path = path.as_ref();
    let scenario = Scenario::load(path)?;
    let mut outcome = run_scenario(&scenario);
    outcome.file = Some(path.display().to_string());
    Ok(outcome)
}

fn execute(scenario: &Scenario, stage: Stage) -> ScenarioOutcome {
    debug!(scenario = %scenario.name, ?stage, "running scenario");
    let surrogate = Surrogate::with_options(
        scenario.surrogate.name.clone(),
        SurrogateOptions {
            mode: scenario.surrogate.mode,
        },
    );
    let result = drive(scenario, &surrogate, stage);
    let report = (stage == Stage::Run).then(|| surrogate.report());
    judge(scenario, result, report)
}

fn drive(scenario: &Scenario, surrogate: &Surrogate, stage: Stage) -> Result<(), DecoyError> {
    let methods = declare(scenario)?;
    for def in &scenario.expectations {
        arm(surrogate, lookup(&methods, &def.method)?, def)?;
    }
    if stage == Stage::Check {
        return Ok(());
    }
    for (position, def) in scenario.calls.iter().enumerate() {
        perform(surrogate, lookup(&methods, &def.method)?, position + 1, def)?;
    }
    match scenario.verify {
        VerifyMode::Expectations => surrogate.verify(),
        VerifyMode::All => surrogate.verify_all(),
        VerifyMode::Skip => Ok(()),
    }
}

fn declare(scenario: &Scenario) -> Result<HashMap<&str, MethodSig>, DecoyError> {
    let mut methods = HashMap::new();
    for def in &scenario.methods {
        let sig = def.signature(&scenario.surrogate.name);
        if methods.insert(def.name.as_str(), sig).is_some() {
            return Err(DecoyError::scenario(
                format!("method '{}' is declared twice", def.name),
                None,
            ));
        }
    }
    Ok(methods)
}

fn lookup<'m>(methods: &'m HashMap<&str, MethodSig>, name: &str) -> Result<&'m MethodSig, DecoyError> {
    methods.get(name).ok_or_else(|| {
        DecoyError::scenario(format!("method '{name}' is not declared"), None)
    })
}

// ============================================================================
// STAGES
// ============================================================================

fn arm(surrogate: &Surrogate, method: &MethodSig, def: &ExpectationDef) -> Result<(), DecoyError> {
    let specs = def
        .args
        .iter()
        .enumerate()
        .map(|(i, json)| match method.params().get(i) {
            Some(param) => arg_spec(json, param),
            // Surplus arguments still parse so the binder can report the count.
            None => arg_spec(
                json,
                &Param {
                    name: format!("arg{i}"),
                    kind: ValueKind::Any,
                    mode: PassingMode::ByValue,
                },
            ),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut handle = match def.kind {
        ExpectationKind::Expect => surrogate.expect(method, specs)?,
        ExpectationKind::Stub => surrogate.stub(method, specs)?,
    };
    if let Some(repeat) = def.repeat {
        handle = handle.repeat(repeat)?;
    }
    match (&def.returns, &def.raises) {
        (Some(_), Some(_)) => Err(err_ctx!(
            Configuration,
            "an expectation cannot both return a value and raise",
            method.target()
        )),
        (Some(value), None) => handle.returns(literal(value, method.return_kind())).map(drop),
        (None, Some(message)) => {
            handle.raises(message.as_str());
            Ok(())
        }
        (None, None) => Ok(()),
    }
}

fn perform(
    surrogate: &Surrogate,
    method: &MethodSig,
    position: usize,
    def: &CallDef,
) -> Result<(), DecoyError> {
    if def.args.len() != method.arity() {
        return Err(DecoyError::scenario(
            format!(
                "call #{position} passes {} argument(s) to {}, which declares {}",
                def.args.len(),
                method.target(),
                method.arity()
            ),
            None,
        ));
    }

    let mut slots: Vec<Value> = def
        .args
        .iter()
        .zip(method.params())
        .map(|(json, param)| literal(json, param.kind))
        .collect();
    let described = format_call(method, &slots);

    let returned = {
        let mut call = Call::new();
        for (param, slot) in method.params().iter().zip(slots.iter_mut()) {
            call = if param.mode.writes_back() {
                let prior = slot.clone();
                call.writer(prior, move |value| *slot = value)
            } else {
                call.arg(slot.clone())
            };
        }
        surrogate.invoke(method, call)?
    };

    if let Some(expected) = &def.returns {
        let expected = literal(expected, method.return_kind());
        if !numeric::equivalent(method.return_kind(), &returned, &expected) {
            return Err(DecoyError::scenario(
                format!(
                    "call #{position} {described} returned {}, expected {}",
                    returned.describe(),
                    expected.describe()
                ),
                None,
            ));
        }
    }

    for (&index, expected) in &def.writes {
        let (param, actual) = method
            .params()
            .get(index)
            .zip(slots.get(index))
            .ok_or_else(|| {
                DecoyError::scenario(
                    format!("call #{position} asserts a write to missing argument {index}"),
                    None,
                )
            })?;
        let expected = literal(expected, param.kind);
        if !numeric::equivalent(param.kind, actual, &expected) {
            return Err(DecoyError::scenario(
                format!(
                    "call #{position} {described} left {} = {}, expected {}",
                    param.name,
                    actual.describe(),
                    expected.describe()
                ),
                None,
            ));
        }
    }
    Ok(())
}

// ============================================================================
// JUDGEMENT
// ============================================================================

fn judge(
    scenario: &Scenario,
    result: Result<(), DecoyError>,
    report: Option<VerificationReport>,
) -> ScenarioOutcome {
    let (passed, message, error) = match (&scenario.outcome, result) {
        (Outcome::Pass, Ok(())) => (true, None, None),
        (Outcome::Pass, Err(e)) => (false, Some(e.to_string()), Some(e)),
        (Outcome::Fail(expected), Ok(())) => (
            false,
            Some(format!(
                "expected a failure mentioning {expected:?}, but the scenario passed"
            )),
            None,
        ),
        (Outcome::Fail(expected), Err(e)) => {
            let text = e.to_string();
            if text.contains(expected.as_str()) {
                (true, Some(text), None)
            } else {
                (
                    false,
                    Some(format!(
                        "expected a failure mentioning {expected:?}, got: {text}"
                    )),
                    Some(e),
                )
            }
        }
    };
    debug!(scenario = %scenario.name, passed, "judged scenario");
    ScenarioOutcome {
        name: scenario.name.clone(),
        file: None,
        passed,
        message,
        report,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Format;

    fn scenario(yaml: &str) -> Scenario {
        Scenario::parse(yaml, "inline.yaml", Format::Yaml).unwrap()
    }

    const THREE_ARGS: &str = r#"
name: three args
surrogate: { name: IDemo }
methods:
  - name: VoidThreeArgs
    params: [{name: a, kind: i32}, {name: b, kind: text}, {name: c, kind: f32}]
expectations:
  - method: VoidThreeArgs
    args: [anything, {contains: eine}, {less_than: 2.5}]
calls:
  - method: VoidThreeArgs
    args: [3, Steinegger, 2.4]
"#;

    #[test]
    fn passing_scenario() {
        let outcome = run_scenario(&scenario(THREE_ARGS));
        assert!(outcome.passed, "{:?}", outcome.message);
        assert!(outcome.report.unwrap().is_clean());
    }

    #[test]
    fn failing_call_is_judged_against_expected_failure() {
        let yaml = THREE_ARGS.replace("[3, Steinegger, 2.4]", "[2, Steinegger, 2.6]");
        let failing = run_scenario(&scenario(&yaml));
        assert!(!failing.passed);
        assert!(failing
            .message
            .unwrap()
            .contains(r#"IDemo.VoidThreeArgs(2, "Steinegger", 2.6); Expected #0, Actual #1."#));

        let asserted = format!("{yaml}outcome: {{fail: \"Expected #0, Actual #1\"}}\n");
        assert!(run_scenario(&scenario(&asserted)).passed);
    }

    #[test]
    fn output_and_reference_slots_are_written() {
        let yaml = r#"
name: ref out
surrogate: { name: ITestInterface }
methods:
  - name: RefOut
    params:
      - {name: s, kind: text}
      - {name: i, kind: i32, mode: out}
      - {name: s1, kind: text}
      - {name: s2, kind: text, mode: ref}
expectations:
  - method: RefOut
    args: [{equal: Here}, {out: 3}, {equal: Hello}, {ref: {prior: {equal: Hello}, value: ""}}]
calls:
  - method: RefOut
    args: [Here, 99, Hello, Hello]
    writes: {1: 3, 3: ""}
"#;
        let outcome = run_scenario(&scenario(yaml));
        assert!(outcome.passed, "{:?}", outcome.message);
    }

    #[test]
    fn check_only_arms() {
        let yaml = r#"
name: too few
surrogate: { name: IDemo }
methods:
  - name: VoidThreeArgs
    params: [{name: a, kind: i32}, {name: b, kind: text}, {name: c, kind: f32}]
expectations:
  - method: VoidThreeArgs
    args: [anything, anything]
outcome: {fail: too few}
"#;
        let outcome = check_scenario(&scenario(yaml));
        assert!(outcome.passed);
        assert!(outcome.report.is_none());
    }

    #[test]
    fn undeclared_method_fails() {
        let yaml = "name: x\nsurrogate: {name: S}\ncalls: [{method: Missing}]\n";
        let outcome = run_scenario(&scenario(yaml));
        assert!(!outcome.passed);
        assert!(outcome.message.unwrap().contains("'Missing' is not declared"));
    }
}
