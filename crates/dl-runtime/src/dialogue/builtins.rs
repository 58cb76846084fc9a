use std::cell::RefCell;
use std::rc::Rc;

use dl_core::{FunctionLibrary, Value};

use super::RunState;

pub(super) const VISITED: &str = "visited";
pub(super) const ASSERT: &str = "assert";

pub(super) fn register(library: &mut FunctionLibrary, run_state: &Rc<RefCell<RunState>>) {
    let state = Rc::clone(run_state);
    library.register(VISITED, 1, move |args| {
        let visited = state.borrow().visited.contains(&args[0].as_string());
        Some(Value::Bool(visited))
    });

    let state = Rc::clone(run_state);
    library.register_void(ASSERT, 1, move |args| {
        if !args[0].as_bool() {
            state.borrow_mut().stop_executing = true;
        }
    });
}
