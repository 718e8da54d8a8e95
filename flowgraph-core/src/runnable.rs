use crate::action::Action;
use anyhow::Result;
use async_trait::async_trait;
use flowgraph_context::{Params, SharedStore};
use std::sync::Arc;

/// Anything a flow can step through: node runners and flows alike.
///
/// A flow calls `run_with` or `run_async_with` depending on its own mode and
/// never needs to know which concrete variant sits behind a node id.
#[async_trait]
pub trait Runnable: Send + Sync {
    fn name(&self) -> &str;

    /// Parameters used when this runnable is the entry point of a run.
    fn params(&self) -> &Params;

    /// True when only `run_async_with` can drive this runnable.
    fn is_async(&self) -> bool {
        false
    }

    /// Blocking entry point, called with the effective parameters of the
    /// enclosing run.
    fn run_with(
        &self,
        shared: &SharedStore,
        params: &Params,
    ) -> Result<Option<Action>>;

    /// Suspending entry point. Blocking runnables are run inline.
    async fn run_async_with(
        &self,
        shared: &SharedStore,
        params: &Params,
    ) -> Result<Option<Action>> {
        self.run_with(shared, params)
    }

    /// Runs this runnable on its own with its own parameters.
    fn run(&self, shared: &SharedStore) -> Result<Option<Action>> {
        self.run_with(shared, self.params())
    }

    async fn run_async(&self, shared: &SharedStore) -> Result<Option<Action>> {
        self.run_async_with(shared, self.params()).await
    }
}

#[async_trait]
impl<R: Runnable + ?Sized> Runnable for Arc<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn params(&self) -> &Params {
        (**self).params()
    }

    fn is_async(&self) -> bool {
        (**self).is_async()
    }

    fn run_with(
        &self,
        shared: &SharedStore,
        params: &Params,
    ) -> Result<Option<Action>> {
        (**self).run_with(shared, params)
    }

    async fn run_async_with(
        &self,
        shared: &SharedStore,
        params: &Params,
    ) -> Result<Option<Action>> {
        (**self).run_async_with(shared, params).await
    }
}

/// Last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
