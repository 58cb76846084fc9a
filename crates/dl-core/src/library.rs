use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::{DialogueError, Value};

pub type NativeFunction = Rc<dyn Fn(&[Value]) -> Option<Value>>;
pub type LibraryFunction = Rc<dyn Fn(&FunctionLibrary, &[Value]) -> Result<Option<Value>, DialogueError>>;

#[derive(Clone)]
enum Implementation {
    Native(NativeFunction),
    Library(LibraryFunction),
}

#[derive(Clone)]
pub struct FunctionEntry {
    pub name: String,
    pub arity: usize,
    implementation: Implementation,
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Name-keyed registry of fixed-arity operations over `Value` lists.
#[derive(Clone, Default)]
pub struct FunctionLibrary {
    functions: HashMap<String, FunctionEntry>,
}

impl fmt::Debug for FunctionLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionLibrary")
            .field("functions", &self.names())
            .finish()
    }
}

impl FunctionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, arity: usize, function: F)
    where
        F: Fn(&[Value]) -> Option<Value> + 'static,
    {
        self.insert(name.into(), arity, Implementation::Native(Rc::new(function)));
    }

    pub fn register_void<F>(&mut self, name: impl Into<String>, arity: usize, function: F)
    where
        F: Fn(&[Value]) + 'static,
    {
        self.register(name, arity, move |args| {
            function(args);
            None
        });
    }

    pub fn register_with_library<F>(&mut self, name: impl Into<String>, arity: usize, function: F)
    where
        F: Fn(&FunctionLibrary, &[Value]) -> Result<Option<Value>, DialogueError> + 'static,
    {
        self.insert(name.into(), arity, Implementation::Library(Rc::new(function)));
    }

    fn insert(&mut self, name: String, arity: usize, implementation: Implementation) {
        self.functions.insert(
            name.clone(),
            FunctionEntry {
                name,
                arity,
                implementation,
            },
        );
    }

    pub fn lookup(&self, name: &str) -> Result<&FunctionEntry, DialogueError> {
        self.functions.get(name).ok_or_else(|| {
            DialogueError::new(
                "LIBRARY_FUNCTION_NOT_FOUND",
                format!("Function \"{}\" is not registered.", name),
            )
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Option<Value>, DialogueError> {
        let entry = self.lookup(name)?;
        if args.len() != entry.arity {
            return Err(DialogueError::new(
                "LIBRARY_ARITY_MISMATCH",
                format!(
                    "Function \"{}\" expects {} argument(s), got {}.",
                    name,
                    entry.arity,
                    args.len()
                ),
            ));
        }

        match &entry.implementation {
            Implementation::Native(function) => Ok(function(args)),
            Implementation::Library(function) => function(self, args),
        }
    }

    pub fn import_library(&mut self, other: &FunctionLibrary) {
        for (name, entry) in &other.functions {
            self.functions.insert(name.clone(), entry.clone());
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names = self.functions.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
