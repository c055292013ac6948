//! # Shared Fixtures
//!
//! Method signatures of the interfaces under test, plus the hand-written delegation
//! wrappers that turn ordinary Rust calls into surrogate invocations.
#![allow(dead_code)]

use decoy::prelude::*;
use once_cell::sync::Lazy;

// =============================================================================
// SIGNATURES
// =============================================================================

pub static VOID_NO_ARGS: Lazy<MethodSig> = Lazy::new(|| MethodSig::new("IDemo", "VoidNoArgs"));

pub static VOID_STRING_ARG: Lazy<MethodSig> =
    Lazy::new(|| MethodSig::new("IDemo", "VoidStringArg").param_of::<String>("s"));

pub static STRING_ARG_STRING: Lazy<MethodSig> = Lazy::new(|| {
    MethodSig::new("IDemo", "StringArgString")
        .param_of::<String>("s")
        .returns(ValueKind::Text)
});

pub static VOID_THREE_ARGS: Lazy<MethodSig> = Lazy::new(|| {
    MethodSig::new("IDemo", "VoidThreeArgs")
        .param_of::<i32>("i")
        .param_of::<String>("s")
        .param_of::<f32>("f")
});

pub static REF_OUT: Lazy<MethodSig> = Lazy::new(|| {
    MethodSig::new("ITestInterface", "RefOut")
        .param_of::<String>("str")
        .output("i", ValueKind::I32)
        .param_of::<String>("str2")
        .reference("j", ValueKind::I32)
        .param_of::<String>("str3")
});

pub static VOID_LIST: Lazy<MethodSig> =
    Lazy::new(|| MethodSig::new("ITestInterface", "VoidList").param_of::<Vec<String>>("list"));

pub static VOID_OBJECT: Lazy<MethodSig> =
    Lazy::new(|| MethodSig::new("ITestInterface", "VoidObject").param_of::<Value>("obj"));

pub static GET_USER: Lazy<MethodSig> = Lazy::new(|| {
    MethodSig::new("ITestService", "GetUser")
        .param_of::<i64>("id")
        .returns(ValueKind::Text)
});

pub static STRING_DELEGATE: Lazy<MethodSig> = Lazy::new(|| {
    MethodSig::new("StringDelegateWithParams", "Invoke")
        .param_of::<i32>("a")
        .param_of::<String>("b")
        .returns(ValueKind::Text)
});

// =============================================================================
// DELEGATION WRAPPERS
// =============================================================================

pub struct Demo(pub Surrogate);

impl Demo {
    pub fn strict() -> Self {
        Demo(Surrogate::strict("IDemo"))
    }

    pub fn lenient() -> Self {
        Demo(Surrogate::lenient("IDemo"))
    }

    pub fn void_no_args(&self) -> Result<(), DecoyError> {
        self.0.invoke(&VOID_NO_ARGS, Call::new()).map(drop)
    }

    pub fn void_string_arg(&self, s: &str) -> Result<(), DecoyError> {
        self.0.invoke(&VOID_STRING_ARG, Call::new().arg(s)).map(drop)
    }

    pub fn string_arg_string(&self, s: &str) -> Result<Option<String>, DecoyError> {
        let returned = self.0.invoke(&STRING_ARG_STRING, Call::new().arg(s))?;
        Option::<String>::from_value(returned)
    }

    pub fn void_three_args(&self, i: i32, s: &str, f: f32) -> Result<(), DecoyError> {
        self.0
            .invoke(&VOID_THREE_ARGS, Call::new().arg(i).arg(s).arg(f))
            .map(drop)
    }
}

pub struct TestInterface(pub Surrogate);

impl TestInterface {
    pub fn strict() -> Self {
        TestInterface(Surrogate::strict("ITestInterface"))
    }

    pub fn lenient() -> Self {
        TestInterface(Surrogate::lenient("ITestInterface"))
    }

    pub fn ref_out(
        &self,
        s: &str,
        i: &mut i32,
        s2: &str,
        j: &mut i32,
        s3: &str,
    ) -> Result<(), DecoyError> {
        let call = Call::new().arg(s).out(i).arg(s2).reference(j).arg(s3);
        self.0.invoke(&REF_OUT, call).map(drop)
    }

    pub fn void_list(&self, list: &[&str]) -> Result<(), DecoyError> {
        self.0
            .invoke(&VOID_LIST, Call::new().arg(list.to_vec()))
            .map(drop)
    }

    pub fn void_object(&self, obj: impl Into<Value>) -> Result<(), DecoyError> {
        self.0.invoke(&VOID_OBJECT, Call::new().arg(obj)).map(drop)
    }
}

pub struct TestService(pub Surrogate);

impl TestService {
    pub fn lenient() -> Self {
        TestService(Surrogate::lenient("ITestService"))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<String>, DecoyError> {
        let returned = self.0.invoke(&GET_USER, Call::new().arg(id))?;
        Option::<String>::from_value(returned)
    }
}

pub struct StringDelegate(pub Surrogate);

impl StringDelegate {
    pub fn lenient() -> Self {
        StringDelegate(Surrogate::lenient("StringDelegateWithParams"))
    }

    pub fn call(&self, a: i32, b: &str) -> Result<Option<String>, DecoyError> {
        let returned = self.0.invoke(&STRING_DELEGATE, Call::new().arg(a).arg(b))?;
        Option::<String>::from_value(returned)
    }
}
