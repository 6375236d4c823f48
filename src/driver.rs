//! The command surface the registry layer needs from a driver.
//!
//! The notification side of a driver is a plain channel
//! ([`crate::event::NotificationReceiver`]); this trait covers the
//! synchronous calls made back into it.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{NetworkId, ValueId};

/// Command submission interface of a network driver.
pub trait Driver: Send + Sync {
    /// Submits a new boolean state for `value`.
    ///
    /// Returns whether the driver accepted the request. Acceptance is not
    /// confirmation that the device changed state.
    fn set_value(&self, value: ValueId, state: bool) -> BoxFuture<'_, Result<bool>>;

    /// Reads the current state of `value` rendered as text.
    fn value_as_string(&self, value: ValueId) -> BoxFuture<'_, Result<String>>;

    /// Asks the controller of `network_id` to abandon its running command.
    fn cancel_controller_command(&self, network_id: NetworkId) -> BoxFuture<'_, Result<bool>>;
}

impl<D: Driver + ?Sized> Driver for Arc<D> {
    fn set_value(&self, value: ValueId, state: bool) -> BoxFuture<'_, Result<bool>> {
        (**self).set_value(value, state)
    }

    fn value_as_string(&self, value: ValueId) -> BoxFuture<'_, Result<String>> {
        (**self).value_as_string(value)
    }

    fn cancel_controller_command(&self, network_id: NetworkId) -> BoxFuture<'_, Result<bool>> {
        (**self).cancel_controller_command(network_id)
    }
}
