//! Optimistic edits on the todo list.

use crate::api_client::RestClient;
use async_trait::async_trait;
use camper_cache::{FetchContext, Mutation};
use camper_core::{CamperResult, RecordId, TodoInfo};
use std::sync::Arc;

/// Where a todo lives on the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoTarget {
    pub account_id: String,
    pub project_id: RecordId,
    pub todo_id: RecordId,
}

/// Marks a todo complete or open.
pub struct TodoCompleteMutation {
    client: Arc<RestClient>,
    target: TodoTarget,
    completed: bool,
}

impl TodoCompleteMutation {
    pub fn new(client: Arc<RestClient>, target: TodoTarget, completed: bool) -> Self {
        Self {
            client,
            target,
            completed,
        }
    }
}

#[async_trait]
impl Mutation<Vec<TodoInfo>> for TodoCompleteMutation {
    fn apply_locally(&self, current: &Vec<TodoInfo>) -> Vec<TodoInfo> {
        set_completed(current, self.target.todo_id, self.completed)
    }

    async fn apply_remotely(&self, _ctx: &FetchContext) -> CamperResult<()> {
        let TodoTarget {
            account_id,
            project_id,
            todo_id,
        } = &self.target;
        self.client
            .set_todo_completed(account_id, *project_id, *todo_id, self.completed)
            .await
    }

    fn is_reflected_in(&self, remote: &Vec<TodoInfo>) -> bool {
        remote
            .iter()
            .find(|todo| todo.id == self.target.todo_id)
            .is_some_and(|todo| todo.completed == self.completed)
    }
}

/// Moves a todo to the trash.
pub struct TodoTrashMutation {
    client: Arc<RestClient>,
    target: TodoTarget,
}

impl TodoTrashMutation {
    pub fn new(client: Arc<RestClient>, target: TodoTarget) -> Self {
        Self { client, target }
    }
}

#[async_trait]
impl Mutation<Vec<TodoInfo>> for TodoTrashMutation {
    fn apply_locally(&self, current: &Vec<TodoInfo>) -> Vec<TodoInfo> {
        without(current, self.target.todo_id)
    }

    async fn apply_remotely(&self, _ctx: &FetchContext) -> CamperResult<()> {
        let TodoTarget {
            account_id,
            project_id,
            todo_id,
        } = &self.target;
        self.client.trash_recording(account_id, *project_id, *todo_id).await
    }

    fn is_reflected_in(&self, remote: &Vec<TodoInfo>) -> bool {
        remote.iter().all(|todo| todo.id != self.target.todo_id)
    }
}

pub fn set_completed(todos: &[TodoInfo], todo_id: RecordId, completed: bool) -> Vec<TodoInfo> {
    todos
        .iter()
        .cloned()
        .map(|mut todo| {
            if todo.id == todo_id {
                todo.completed = completed;
            }
            todo
        })
        .collect()
}

pub fn without(todos: &[TodoInfo], todo_id: RecordId) -> Vec<TodoInfo> {
    todos.iter().filter(|todo| todo.id != todo_id).cloned().collect()
}
