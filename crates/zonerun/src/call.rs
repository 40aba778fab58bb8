//! # Call Conventions
//!
//! A zone can run either a named function exported by a module, or a function
//! literal. Both shapes are explicit variants of [`Target`]; [`Call::from_values`]
//! and [`Broadcast::from_values`] recover them from dynamically typed arguments.

use zonepack::Codec;
use zonepack::Function;
use zonepack::Value;

use crate::error::Error;
use crate::error::Result;

/// What an execute call runs.
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    /// A function exported by a module loaded in the isolates.
    Named { module: String, function: String },
    /// A function literal, registered before dispatch.
    Function(Function),
}

/// A fully shaped execute call.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    target: Target,
    args: Vec<Value>,
    timeout: u32,
}

impl Call {
    /// `module.function(args...)`, with `timeout` in milliseconds (0 = none).
    pub fn named(
        module: impl Into<String>,
        function: impl Into<String>,
        args: impl IntoIterator<Item = Value>,
        timeout: u32,
    ) -> Self {
        Self {
            target: Target::Named {
                module: module.into(),
                function: function.into(),
            },
            args: args.into_iter().collect(),
            timeout,
        }
    }

    /// `(function)(args...)`, with `timeout` in milliseconds (0 = none).
    pub fn function(function: Function, args: impl IntoIterator<Item = Value>, timeout: u32) -> Self {
        Self {
            target: Target::Function(function),
            args: args.into_iter().collect(),
            timeout,
        }
    }

    /// Detects the call convention from the runtime type of `arg1`.
    ///
    /// - `(module: string, function: string, args?: array, timeout?: number)`
    /// - `(function, args?: array, timeout?: number)`
    ///
    /// Absent or `null` args mean no arguments; absent or `null` timeout means 0.
    pub fn from_values(arg1: Value, arg2: Value, arg3: Option<Value>, arg4: Option<Value>) -> Result<Self> {
        match arg1 {
            Value::String(module) => {
                let function = match arg2 {
                    Value::String(function) => function,
                    other => {
                        return Err(Error::shape(format!(
                            "expected a function name as the second argument, found {}",
                            other.type_name()
                        )));
                    }
                };
                let args = args_from(arg3)?;
                let timeout = timeout_from(arg4)?;
                Ok(Self::named(module, function, args, timeout))
            }
            Value::Function(function) => {
                if let Some(extra) = arg4 {
                    return Err(Error::shape(format!(
                        "unexpected fourth argument ({}) for a function call",
                        extra.type_name()
                    )));
                }
                let args = args_from(Some(arg2))?;
                let timeout = timeout_from(arg3)?;
                Ok(Self::function(function, args, timeout))
            }
            other => Err(Error::shape(format!(
                "expected a module name or a function as the first argument, found {}",
                other.type_name()
            ))),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    pub(crate) fn into_parts(self) -> (Target, Vec<Value>, u32) {
        (self.target, self.args, self.timeout)
    }
}

/// What a broadcast runs on every isolate.
#[derive(Clone, Debug, PartialEq)]
pub enum Broadcast {
    /// Source text, passed through unmodified.
    Source(String),
    /// A function literal invoked with plain JSON arguments.
    Function { function: Function, args: Vec<Value> },
}

impl Broadcast {
    pub fn source(source: impl Into<String>) -> Self {
        Self::Source(source.into())
    }

    pub fn function(function: Function, args: impl IntoIterator<Item = Value>) -> Self {
        Self::Function {
            function,
            args: args.into_iter().collect(),
        }
    }

    /// Detects the broadcast form from the runtime type of `arg1`.
    ///
    /// Source text takes no arguments; `arg2` is ignored in that form.
    pub fn from_values(arg1: Value, arg2: Option<Value>) -> Result<Self> {
        match arg1 {
            Value::String(source) => Ok(Self::Source(source)),
            Value::Function(function) => Ok(Self::function(function, args_from(arg2)?)),
            other => Err(Error::shape(format!(
                "expected source text or a function, found {}",
                other.type_name()
            ))),
        }
    }

    /// Renders the source string sent to the isolates.
    ///
    /// A function becomes a self-invoking expression: `(<source>)(<a1>,<a2>,...)`,
    /// with arguments rendered by `codec`.
    pub fn to_source(&self, codec: &dyn Codec) -> Result<String> {
        match self {
            Self::Source(source) => Ok(source.clone()),
            Self::Function { function, args } => {
                let rendered = codec.encode_plain(args)?;
                // Strip the enclosing brackets of the JSON array.
                let args = &rendered[1..rendered.len() - 1];
                Ok(format!("({})({})", function.source(), args))
            }
        }
    }
}

fn args_from(value: Option<Value>) -> Result<Vec<Value>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(Error::shape(format!(
            "expected an array of arguments, found {}",
            other.type_name()
        ))),
    }
}

fn timeout_from(value: Option<Value>) -> Result<u32> {
    let timeout = match value {
        None | Some(Value::Null) => return Ok(0),
        Some(Value::Int(ms)) => u32::try_from(ms).ok(),
        Some(Value::Float(ms)) if ms.fract() == 0.0 && ms >= 0.0 && ms <= u32::MAX as f64 => Some(ms as u32),
        Some(_) => None,
    };
    timeout.ok_or_else(|| Error::shape("expected a non-negative integer timeout"))
}
