use dashmap::DashMap;
use futures::future::BoxFuture;

use super::{Mutation, ProgressStore, StoreError};
use crate::{outline::Module, progress::ProgressState, student::StudentId};

#[derive(Debug, Clone, Default)]
struct StudentRecord {
    email: String,
    a: ProgressState,
    b: ProgressState,
}

impl StudentRecord {
    fn module_mut(&mut self, module: Module) -> &mut ProgressState {
        match module {
            Module::A => &mut self.a,
            Module::B => &mut self.b,
        }
    }

    fn module(&self, module: Module) -> &ProgressState {
        match module {
            Module::A => &self.a,
            Module::B => &self.b,
        }
    }
}

/// Process-local store. Updates run under the map's entry lock.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    students: DashMap<StudentId, StudentRecord>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_student(&self, id: StudentId, email: impl Into<String>) {
        self.students.insert(
            id,
            StudentRecord {
                email: email.into(),
                ..Default::default()
            },
        );
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(
        &self,
        student: StudentId,
        module: Module,
    ) -> BoxFuture<'_, Result<ProgressState, StoreError>> {
        let result = self
            .students
            .get(&student)
            .map(|record| record.module(module).clone())
            .ok_or(StoreError::StudentNotFound(student));
        Box::pin(async move { result })
    }

    fn update<'a>(
        &'a self,
        student: StudentId,
        module: Module,
        mutate: Mutation<'a>,
    ) -> BoxFuture<'a, Result<ProgressState, StoreError>> {
        let result = match self.students.get_mut(&student) {
            Some(mut record) => {
                let state = record.module_mut(module);
                mutate(&mut *state);
                Ok(state.clone())
            }
            None => Err(StoreError::StudentNotFound(student)),
        };
        Box::pin(async move { result })
    }

    fn recipient(&self, student: StudentId) -> BoxFuture<'_, Result<String, StoreError>> {
        let result = self
            .students
            .get(&student)
            .map(|record| record.email.clone())
            .ok_or(StoreError::StudentNotFound(student));
        Box::pin(async move { result })
    }
}
