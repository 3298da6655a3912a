use crate::error::HookError;
use crate::severity::Level;

use slog::{self, Drain, Key, OwnedKVList, Record, KV};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// One log record as handed to a [`Hook`].
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<'a> {
    pub level: Level,
    pub message: &'a str,
    /// The record's key/value pairs, rendered as strings.
    pub fields: HashMap<String, String>,
}

/// Something that wants to see every log entry of the levels it subscribes to.
pub trait Hook: Send + Sync {
    fn levels(&self) -> &[Level];

    fn fire(&self, entry: &Entry<'_>) -> Result<(), HookError>;
}

/// Where a [`HookedDrain`] sends records after the hooks have seen them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// The drain it wraps.
    Default,
    /// Nowhere. Entries only reach the hooks.
    Discard,
}

/// The hooks registered with a [`HookedDrain`], shared so they can be changed after the
/// logger is built.
#[derive(Default)]
pub struct Hooks {
    hooks: RwLock<Vec<Arc<dyn Hook>>>,
    discard_output: AtomicBool,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, hook: Arc<dyn Hook>) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    /// Unregisters every hook, releasing them.
    pub fn clear(&self) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_output(&self, output: Output) {
        self.discard_output
            .store(output == Output::Discard, Ordering::Release);
    }

    pub fn output(&self) -> Output {
        if self.discard_output.load(Ordering::Acquire) {
            Output::Discard
        } else {
            Output::Default
        }
    }

    /// Hands the entry to every hook subscribed to its level. A failing hook does not
    /// keep the others from firing.
    pub fn fire(&self, entry: &Entry<'_>) {
        let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner);
        for hook in hooks.iter().filter(|h| h.levels().contains(&entry.level)) {
            if let Err(err) = hook.fire(entry) {
                eprintln!("A log hook failed to fire: {}", err);
            }
        }
    }

    /// Fires a [`Level::Panic`] entry. Meant to be called from a panic hook, since slog
    /// itself has no level above critical.
    pub fn fire_panic(&self, message: &str) {
        self.fire(&Entry {
            level: Level::Panic,
            message,
            fields: HashMap::new(),
        });
    }
}

/// A [`slog::Drain`] that passes every record to its [`Hooks`] and then, unless the output
/// was switched to [`Output::Discard`], to the drain it wraps.
pub struct HookedDrain<D> {
    drain: D,
    hooks: Arc<Hooks>,
}

impl<D: Drain> HookedDrain<D> {
    pub fn new(drain: D, hooks: Arc<Hooks>) -> Self {
        Self { drain, hooks }
    }
}

impl<D: Drain> Drain for HookedDrain<D> {
    type Ok = ();
    type Err = D::Err;

    fn log(&self, record: &Record<'_>, values: &OwnedKVList) -> Result<Self::Ok, Self::Err> {
        if !self.hooks.is_empty() {
            let mut serializer = Serializer::new();
            let _ = record.kv().serialize(record, &mut serializer);
            let _ = values.serialize(record, &mut serializer);

            let message = format!("{}", record.msg());
            self.hooks.fire(&Entry {
                level: record.level().into(),
                message: &message,
                fields: serializer.map,
            });
        }

        match self.hooks.output() {
            Output::Default => self.drain.log(record, values).map(|_| ()),
            Output::Discard => Ok(()),
        }
    }
}

#[derive(Debug)]
struct Serializer {
    map: HashMap<String, String>,
}

impl Serializer {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl slog::Serializer for Serializer {
    fn emit_arguments(&mut self, key: Key, val: &fmt::Arguments) -> slog::Result {
        let mut value = String::new();
        write!(value, "{val}")?;
        self.map.insert(key.into(), value);
        Ok(())
    }
}
