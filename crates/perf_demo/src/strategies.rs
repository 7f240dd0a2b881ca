//! Alternative state-management strategies for a small todo list.
//!
//! Each strategy applies the same actions; they differ only in how state is
//! updated, which is exactly what the demo measures.

use std::sync::{Arc, Mutex};

/// An action dispatched to a store.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Add(String),
    Toggle(usize),
    Remove(usize),
    ClearCompleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Todo {
    pub title: String,
    pub done: bool,
}

/// Common surface of every strategy.
pub trait TodoStore {
    fn name(&self) -> &'static str;
    fn dispatch(&mut self, action: Action);
    fn todos(&self) -> Vec<Todo>;

    fn len(&self) -> usize {
        self.todos().len()
    }

    /// Titles of todos not yet done.
    fn open_titles(&self) -> Vec<String> {
        self.todos()
            .into_iter()
            .filter(|todo| !todo.done)
            .map(|todo| todo.title)
            .collect()
    }
}

/// Replaces the whole list on every action.
#[derive(Debug, Default)]
pub struct CloneOnWrite {
    todos: Arc<Vec<Todo>>,
}

impl TodoStore for CloneOnWrite {
    fn name(&self) -> &'static str {
        "clone_on_write"
    }

    fn dispatch(&mut self, action: Action) {
        let mut next = (*self.todos).clone();
        apply(&mut next, action);
        self.todos = Arc::new(next);
    }

    fn todos(&self) -> Vec<Todo> {
        (*self.todos).clone()
    }
}

/// Pure reducer over owned state.
#[derive(Debug, Default)]
pub struct Reducer {
    state: Vec<Todo>,
}

impl Reducer {
    fn reduce(mut state: Vec<Todo>, action: Action) -> Vec<Todo> {
        apply(&mut state, action);
        state
    }
}

impl TodoStore for Reducer {
    fn name(&self) -> &'static str {
        "reducer"
    }

    fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        self.state = Self::reduce(state, action);
    }

    fn todos(&self) -> Vec<Todo> {
        self.state.clone()
    }
}

/// Shared store mutated in place behind a lock.
#[derive(Debug, Default)]
pub struct SharedStore {
    todos: Arc<Mutex<Vec<Todo>>>,
}

impl TodoStore for SharedStore {
    fn name(&self) -> &'static str {
        "shared_store"
    }

    fn dispatch(&mut self, action: Action) {
        // A poisoned lock still holds usable data for a demo store.
        let mut todos = self.todos.lock().unwrap_or_else(|e| e.into_inner());
        apply(&mut todos, action);
    }

    fn todos(&self) -> Vec<Todo> {
        self.todos.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn apply(todos: &mut Vec<Todo>, action: Action) {
    match action {
        Action::Add(title) => todos.push(Todo { title, done: false }),
        Action::Toggle(index) => {
            if let Some(todo) = todos.get_mut(index) {
                todo.done = !todo.done;
            }
        }
        Action::Remove(index) => {
            if index < todos.len() {
                todos.remove(index);
            }
        }
        Action::ClearCompleted => todos.retain(|todo| !todo.done),
    }
}

/// Builds a fresh, empty store.
pub type StoreFactory = fn() -> Box<dyn TodoStore>;

/// Constructor for each strategy, in display order.
pub fn all() -> Vec<StoreFactory> {
    let factories: [StoreFactory; 3] = [
        || -> Box<dyn TodoStore> { Box::new(CloneOnWrite::default()) },
        || -> Box<dyn TodoStore> { Box::new(Reducer::default()) },
        || -> Box<dyn TodoStore> { Box::new(SharedStore::default()) },
    ];
    factories.to_vec()
}

/// A deterministic workload of `count` actions.
pub fn workload(count: usize) -> impl Iterator<Item = Action> {
    (0..count).map(|i| match i % 10 {
        5 => Action::Remove(i / 3),
        7 => Action::Toggle(i / 2),
        9 => Action::ClearCompleted,
        _ => Action::Add(format!("todo #{i}")),
    })
}
