//! Change notification.
//!
//! Every cache announces which of its observable fields changed once the
//! change is visible to readers. Delivery happens synchronously on the task
//! that made the change; observers that need to hop threads do so themselves.

use derive_more::Display;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Field {
    Icon,
    Thumbnail,
    Poster,
    Sounds,
    Savegames,
}

pub trait ChangeObserver: Send + Sync {
    fn changed(&self, field: Field);
}
impl<F> ChangeObserver for F
where
    F: Fn(Field) + Send + Sync,
{
    fn changed(&self, field: Field) {
        self(field)
    }
}

/// Optional observer shared by the caches of one cartridge.
#[derive(Clone, Default)]
pub(crate) struct Notifier(Option<Arc<dyn ChangeObserver>>);
impl Notifier {
    pub(crate) fn new(observer: Arc<dyn ChangeObserver>) -> Self {
        Self(Some(observer))
    }

    pub(crate) fn notify(&self, field: Field) {
        tracing::trace!(%field, "field changed");
        if let Some(observer) = &self.0 {
            observer.changed(field);
        }
    }
}
impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Notifier").field(&self.0.is_some()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closures_are_observers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let notifier = Notifier::new(Arc::new(move |field: Field| sink.lock().unwrap().push(field)));
        notifier.notify(Field::Poster);
        notifier.notify(Field::Savegames);
        assert_eq!(*seen.lock().unwrap(), vec![Field::Poster, Field::Savegames]);
    }

    #[test]
    fn silent_without_observer() {
        Notifier::default().notify(Field::Sounds);
    }
}
