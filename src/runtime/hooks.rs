use crate::execution::batch::BatchPosition;
use crate::state::snapshot::Snapshot;
use anyhow::{Error as AnyError, Result};
use core::future::Future;
use core::pin::Pin;

pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

pub(crate) fn done<'a>() -> HookFuture<'a> {
    Box::pin(async { Ok(()) })
}

/// Lifecycle observer for batch runs.
///
/// Every method defaults to a no-op. The driver awaits each returned future
/// before moving past the call site, so a slow hook applies back-pressure to
/// the run. Returning an error aborts the run.
///
/// `state` is only borrowed for the duration of the call; the driver replaces
/// its snapshot wholesale afterwards instead of mutating it.
pub trait BatchHooks<T, R>: Send {
    fn on_batch_start<'a>(
        &'a mut self,
        _position: BatchPosition,
        _batch: &'a [T],
        _state: &'a Snapshot,
    ) -> HookFuture<'a> {
        done()
    }

    fn on_batch_complete<'a>(
        &'a mut self,
        _position: BatchPosition,
        _batch: &'a [T],
        _total_processed: u64,
        _total_failed: u64,
        _state: &'a Snapshot,
    ) -> HookFuture<'a> {
        done()
    }

    fn on_page_start<'a>(
        &'a mut self,
        _page: u64,
        _total_pages: u64,
        _state: &'a Snapshot,
    ) -> HookFuture<'a> {
        done()
    }

    /// Fires after every item of a non-empty page has settled. `page_processed`
    /// counts the successes on that page.
    fn on_page_complete<'a>(
        &'a mut self,
        _page: u64,
        _total_pages: u64,
        _page_processed: u64,
        _total_processed: u64,
        _state: &'a Snapshot,
    ) -> HookFuture<'a> {
        done()
    }

    fn on_item_success<'a>(
        &'a mut self,
        _item: &'a T,
        _result: &'a R,
        _total_processed: u64,
        _state: &'a Snapshot,
    ) -> HookFuture<'a> {
        done()
    }

    fn on_item_error<'a>(
        &'a mut self,
        _item: &'a T,
        _error: &'a AnyError,
        _total_failed: u64,
        _state: &'a Snapshot,
    ) -> HookFuture<'a> {
        done()
    }

    /// Fires on every snapshot replacement. `position` is set by the array
    /// executor and absent for paginated runs.
    fn on_state_update<'a>(
        &'a mut self,
        _state: &'a Snapshot,
        _position: Option<BatchPosition>,
    ) -> HookFuture<'a> {
        done()
    }
}

/// Hooks that observe nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl<T, R> BatchHooks<T, R> for NoopHooks {}

impl<T, R, H: BatchHooks<T, R> + ?Sized> BatchHooks<T, R> for &mut H {
    fn on_batch_start<'a>(
        &'a mut self,
        position: BatchPosition,
        batch: &'a [T],
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        (**self).on_batch_start(position, batch, state)
    }

    fn on_batch_complete<'a>(
        &'a mut self,
        position: BatchPosition,
        batch: &'a [T],
        total_processed: u64,
        total_failed: u64,
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        (**self).on_batch_complete(position, batch, total_processed, total_failed, state)
    }

    fn on_page_start<'a>(
        &'a mut self,
        page: u64,
        total_pages: u64,
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        (**self).on_page_start(page, total_pages, state)
    }

    fn on_page_complete<'a>(
        &'a mut self,
        page: u64,
        total_pages: u64,
        page_processed: u64,
        total_processed: u64,
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        (**self).on_page_complete(page, total_pages, page_processed, total_processed, state)
    }

    fn on_item_success<'a>(
        &'a mut self,
        item: &'a T,
        result: &'a R,
        total_processed: u64,
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        (**self).on_item_success(item, result, total_processed, state)
    }

    fn on_item_error<'a>(
        &'a mut self,
        item: &'a T,
        error: &'a AnyError,
        total_failed: u64,
        state: &'a Snapshot,
    ) -> HookFuture<'a> {
        (**self).on_item_error(item, error, total_failed, state)
    }

    fn on_state_update<'a>(
        &'a mut self,
        state: &'a Snapshot,
        position: Option<BatchPosition>,
    ) -> HookFuture<'a> {
        (**self).on_state_update(state, position)
    }
}
