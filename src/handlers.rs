//! Fixed-capacity table mapping a hardware command name prefix to a handler.

use crate::error::{Error, Result};

/// Maximum number of simultaneously registered command handlers.
pub const MAX_HANDLERS: usize = 8;

/// Maximum length of a command-name prefix used for handler lookup.
pub const ACTION_SIZE: usize = 5;

/// Parameters passed to a registered command handler when a matching
/// `HARDWARE` frame arrives.
pub struct HandlerParams<'a> {
    pub id: u16,
    pub command: &'a str,
    pub argv: &'a [&'a str],
}

pub type CommandHandler = Box<dyn FnMut(&HandlerParams<'_>, &mut dyn std::any::Any) + Send>;

struct Entry {
    name: [u8; ACTION_SIZE],
    name_len: u8,
    handler: CommandHandler,
    user_data: Box<dyn std::any::Any + Send>,
}

/// Linear-scan table from a ≤5-byte command-name prefix to `{handler, user_data}`.
/// Registration either updates a matching existing slot or installs into the
/// first empty one.
pub struct HandlerTable {
    entries: [Option<Entry>; MAX_HANDLERS],
}

fn pack_name(name: &str) -> Result<([u8; ACTION_SIZE], u8)> {
    if name.is_empty() || name.len() > ACTION_SIZE {
        return Err(Error::Mem);
    }
    let mut buf = [0u8; ACTION_SIZE];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    Ok((buf, name.len() as u8))
}

impl HandlerTable {
    pub fn new() -> Self {
        Self { entries: [const { None }; MAX_HANDLERS] }
    }

    /// Register `name` (≤5 bytes). Updates the existing slot if `name`
    /// already matches one; otherwise installs into the first empty slot.
    /// Fails with `Error::Mem` if the table is full and no slot matches.
    pub fn register(
        &mut self,
        name: &str,
        handler: CommandHandler,
        user_data: Box<dyn std::any::Any + Send>,
    ) -> Result<()> {
        let (packed, name_len) = pack_name(name)?;

        if let Some(slot) = self.entries.iter_mut().find(
            |e| matches!(e, Some(e) if e.name == packed && e.name_len == name_len),
        ) {
            *slot = Some(Entry { name: packed, name_len, handler, user_data });
            return Ok(());
        }

        match self.entries.iter_mut().find(|e| e.is_none()) {
            Some(slot) => {
                *slot = Some(Entry { name: packed, name_len, handler, user_data });
                Ok(())
            }
            None => Err(Error::Mem),
        }
    }

    /// Remove the handler registered for `name`, if any.
    pub fn deregister(&mut self, name: &str) {
        let Ok((packed, name_len)) = pack_name(name) else { return };
        if let Some(slot) = self.entries.iter_mut().find(
            |e| matches!(e, Some(e) if e.name == packed && e.name_len == name_len),
        ) {
            *slot = None;
        }
    }

    /// Find the first registered handler whose name matches `name` and
    /// invoke it with `params`. Returns `true` if a handler was found and
    /// invoked.
    pub fn dispatch(&mut self, name: &str, params: &HandlerParams<'_>) -> bool {
        let Ok((packed, name_len)) = pack_name(name) else { return false };
        if let Some(entry) = self.entries.iter_mut().find(
            |e| matches!(e, Some(e) if e.name == packed && e.name_len == name_len),
        ) {
            if let Some(entry) = entry {
                (entry.handler)(params, entry.user_data.as_mut());
                return true;
            }
        }
        false
    }

    pub fn registered_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Remove and return the handler matching `name`, leaving its slot
    /// empty. Paired with [`HandlerTable::restore`] so a caller holding a
    /// shared lock on the table can release it before invoking user code,
    /// per this crate's rule that user callbacks never run under the lock.
    pub(crate) fn take_matching(
        &mut self,
        name: &str,
    ) -> Option<(usize, [u8; ACTION_SIZE], u8, CommandHandler, Box<dyn std::any::Any + Send>)> {
        let (packed, name_len) = pack_name(name).ok()?;
        let idx = self.entries.iter().position(
            |e| matches!(e, Some(e) if e.name == packed && e.name_len == name_len),
        )?;
        let entry = self.entries[idx].take()?;
        Some((idx, entry.name, entry.name_len, entry.handler, entry.user_data))
    }

    /// Put a handler taken by [`HandlerTable::take_matching`] back, unless
    /// the slot was reused (e.g. re-registered) while the handler ran.
    pub(crate) fn restore(
        &mut self,
        idx: usize,
        name: [u8; ACTION_SIZE],
        name_len: u8,
        handler: CommandHandler,
        user_data: Box<dyn std::any::Any + Send>,
    ) {
        if self.entries[idx].is_none() {
            self.entries[idx] = Some(Entry { name, name_len, handler, user_data });
        }
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}
