// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Props
//!
//! Factory recipes for actor instances. The system keeps one `Props` per actor type and calls
//! it every time a cell needs a fresh instance: on first use and after each restart.
//!

use crate::{Error, actor::Actor};

use bus::panic_message;

use std::{
    any::{TypeId, type_name},
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

type Factory<A> = dyn Fn() -> Result<A, Error> + Send + Sync;

/// Factory recipe binding an actor type to its constructor.
///
/// ```ignore
/// system.register_props(Props::new(|| Counter { total: 0 })).await;
///
/// let url = config.url.clone();
/// system.register_props(Props::try_new(move || Client::connect(&url))).await;
/// ```
pub struct Props<A: Actor> {
    factory: Arc<Factory<A>>,
}

impl<A: Actor> Props<A> {
    /// Props from an infallible constructor.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move || Ok(factory())),
        }
    }

    /// Props from a constructor that may fail. A failure is an initialization failure and is
    /// never retried.
    pub fn try_new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<A, Error> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    pub(crate) fn type_id() -> TypeId {
        TypeId::of::<A>()
    }

    pub(crate) fn type_name() -> &'static str {
        type_name::<A>()
    }

    /// Builds a new instance, turning a constructor panic into an error.
    pub(crate) fn produce(&self) -> Result<A, Error> {
        match catch_unwind(AssertUnwindSafe(|| (self.factory)())) {
            Ok(Ok(actor)) => Ok(actor),
            Ok(Err(error)) => Err(error),
            Err(payload) => Err(Error::Start(panic_message(payload.as_ref()))),
        }
    }
}

impl<A: Actor> Clone for Props<A> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
        }
    }
}

impl<A: Actor> fmt::Debug for Props<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("type", &Self::type_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use crate::{ActorContext, Handler, Message};

    use async_trait::async_trait;

    struct Ticker;

    struct Tick;

    impl Message for Tick {}

    #[async_trait]
    impl Actor for Ticker {
        type Message = Tick;
        type Response = ();
    }

    #[async_trait]
    impl Handler<Ticker> for Ticker {
        async fn handle(
            &mut self,
            _msg: Tick,
            _ctx: &mut ActorContext<Ticker>,
        ) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn test_props_identify_actor_type() {
        assert_eq!(Props::<Ticker>::type_id(), TypeId::of::<Ticker>());
        assert!(Props::<Ticker>::type_name().ends_with("Ticker"));
    }

    #[test]
    fn test_produce_maps_constructor_failures() {
        assert!(Props::new(|| Ticker).produce().is_ok());

        let failing = Props::<Ticker>::try_new(|| {
            Err(Error::Functional("offline".to_owned()))
        });
        assert_eq!(
            failing.produce().err(),
            Some(Error::Functional("offline".to_owned()))
        );

        let panicking = Props::<Ticker>::try_new(|| panic!("no memory"));
        assert_eq!(
            panicking.produce().err(),
            Some(Error::Start("no memory".to_owned()))
        );
    }
}
