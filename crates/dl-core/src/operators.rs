use crate::{FunctionLibrary, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    UnaryNegate,
    Divide,
    Multiply,
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    And,
    Or,
    Xor,
    Not,
}

impl Operator {
    pub const ALL: [Operator; 15] = [
        Self::Add,
        Self::Subtract,
        Self::UnaryNegate,
        Self::Divide,
        Self::Multiply,
        Self::EqualTo,
        Self::NotEqualTo,
        Self::GreaterThan,
        Self::GreaterThanOrEqualTo,
        Self::LessThan,
        Self::LessThanOrEqualTo,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Not,
    ];

    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Subtract => "Minus",
            Self::UnaryNegate => "UnaryMinus",
            Self::Divide => "Divide",
            Self::Multiply => "Multiply",
            Self::EqualTo => "EqualTo",
            Self::NotEqualTo => "NotEqualTo",
            Self::GreaterThan => "GreaterThan",
            Self::GreaterThanOrEqualTo => "GreaterThanOrEqualTo",
            Self::LessThan => "LessThan",
            Self::LessThanOrEqualTo => "LessThanOrEqualTo",
            Self::And => "And",
            Self::Or => "Or",
            Self::Xor => "Xor",
            Self::Not => "Not",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::UnaryNegate | Self::Not => 1,
            _ => 2,
        }
    }

    pub fn from_canonical_name(name: &str) -> Option<Operator> {
        Self::ALL
            .iter()
            .copied()
            .find(|operator| operator.canonical_name() == name)
    }
}

pub fn equal_to(left: &Value, right: &Value) -> bool {
    match right {
        Value::Number(number) => left.as_number() == *number,
        Value::String(text) => left.as_string() == *text,
        Value::Bool(flag) => left.as_bool() == *flag,
        Value::Null => left.is_null(),
    }
}

pub fn add(left: &Value, right: &Value) -> Value {
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        let mut text = left.as_string();
        text.push_str(&right.as_string());
        Value::String(text)
    } else {
        Value::Number(left.as_number() + right.as_number())
    }
}

pub struct StandardOperatorSet;

impl StandardOperatorSet {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> FunctionLibrary {
        let mut library = FunctionLibrary::new();
        Self::register_into(&mut library);
        library
    }

    pub fn register_into(library: &mut FunctionLibrary) {
        for operator in Operator::ALL {
            let name = operator.canonical_name();
            let arity = operator.arity();
            match operator {
                Operator::Add => library.register(name, arity, |args| Some(add(&args[0], &args[1]))),
                Operator::Subtract => numeric(library, name, |a, b| a - b),
                Operator::UnaryNegate => {
                    library.register(name, arity, |args| Some(Value::Number(-args[0].as_number())))
                }
                Operator::Divide => numeric(library, name, |a, b| a / b),
                Operator::Multiply => numeric(library, name, |a, b| a * b),
                Operator::EqualTo => library.register(name, arity, |args| {
                    Some(Value::Bool(equal_to(&args[0], &args[1])))
                }),
                Operator::NotEqualTo => library.register_with_library(name, arity, |library, args| {
                    let equal = library
                        .invoke(Operator::EqualTo.canonical_name(), args)?
                        .map(|value| value.as_bool())
                        .unwrap_or(false);
                    Ok(Some(Value::Bool(!equal)))
                }),
                Operator::GreaterThan => comparison(library, name, |a, b| a > b),
                Operator::GreaterThanOrEqualTo => comparison(library, name, |a, b| a >= b),
                Operator::LessThan => comparison(library, name, |a, b| a < b),
                Operator::LessThanOrEqualTo => comparison(library, name, |a, b| a <= b),
                Operator::And => logical(library, name, |a, b| a && b),
                Operator::Or => logical(library, name, |a, b| a || b),
                Operator::Xor => logical(library, name, |a, b| a ^ b),
                Operator::Not => library.register(name, arity, |args| Some(Value::Bool(!args[0].as_bool()))),
            }
        }
    }
}

fn numeric(library: &mut FunctionLibrary, name: &str, apply: fn(f64, f64) -> f64) {
    library.register(name, 2, move |args| {
        Some(Value::Number(apply(args[0].as_number(), args[1].as_number())))
    });
}

fn comparison(library: &mut FunctionLibrary, name: &str, apply: fn(f64, f64) -> bool) {
    library.register(name, 2, move |args| {
        Some(Value::Bool(apply(args[0].as_number(), args[1].as_number())))
    });
}

fn logical(library: &mut FunctionLibrary, name: &str, apply: fn(bool, bool) -> bool) {
    library.register(name, 2, move |args| {
        Some(Value::Bool(apply(args[0].as_bool(), args[1].as_bool())))
    });
}
