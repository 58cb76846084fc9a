use dl_core::{DialogueError, Expression, Value};

use super::EvalContext;

pub fn evaluate(
    expression: &Expression,
    context: &mut EvalContext<'_>,
) -> Result<Value, DialogueError> {
    match expression {
        Expression::Literal { value } => Ok(value.clone()),
        Expression::Variable { name } => Ok(context.variables.get(name)),
        Expression::Call { function, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, context)?);
            }
            let result = context.library.invoke(function, &values)?;
            Ok(result.unwrap_or(Value::Null))
        }
    }
}
