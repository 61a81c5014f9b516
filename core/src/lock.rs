use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

#[derive(Default)]
struct LockState {
    readers: usize,
    writers: usize,
    owner: Option<ThreadId>,
}

impl LockState {
    fn is_owner(&self) -> bool {
        self.owner == Some(thread::current().id())
    }
}

/// Multi-reader / single-writer lock with writer reentrancy: the thread
/// holding the write lock may take further read or write locks without
/// blocking, as long as every acquisition is balanced by a release.
///
/// No fairness is guaranteed; a stream of readers can delay a writer.
///
/// The raw `lock_*`/`unlock_*` protocol is public because its misuse errors
/// are part of the contract; [`read`](Self::read) and
/// [`write`](Self::write) wrap it in guards that release on drop, including
/// during unwinding.
#[derive(Default)]
pub struct ReadWriteLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl ReadWriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks while a writer other than the current thread is active, then
    /// registers a reader.
    pub fn lock_read(&self) {
        let mut state = self.state.lock();
        while state.writers > 0 && !state.is_owner() {
            self.released.wait(&mut state);
        }
        state.readers += 1;
    }

    /// Deregisters a reader, waking all waiters when the last one leaves.
    pub fn unlock_read(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.readers == 0 {
            return Err(Error::IllegalState("no readers are active"));
        }
        state.readers -= 1;
        if state.readers == 0 {
            self.released.notify_all();
        }
        Ok(())
    }

    /// Blocks while any reader or another writer is active, then registers
    /// this thread as the active writer.
    pub fn lock_write(&self) {
        let mut state = self.state.lock();
        while (state.writers > 0 || state.readers > 0) && !state.is_owner() {
            self.released.wait(&mut state);
        }
        state.writers += 1;
        state.owner = Some(thread::current().id());
    }

    /// Deregisters a writer; the final release clears ownership and wakes
    /// all waiters. Only the owning thread may release.
    pub fn unlock_write(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.writers == 0 {
            return Err(Error::IllegalState("no writers are active"));
        }
        if !state.is_owner() {
            return Err(Error::WrongOwner);
        }
        state.writers -= 1;
        if state.writers == 0 {
            state.owner = None;
            self.released.notify_all();
        }
        Ok(())
    }

    #[must_use]
    pub fn read(&self) -> ReadGuard<'_> {
        self.lock_read();
        ReadGuard { lock: self }
    }

    #[must_use]
    pub fn write(&self) -> WriteGuard<'_> {
        self.lock_write();
        WriteGuard { lock: self }
    }

    pub fn readers(&self) -> usize {
        self.state.lock().readers
    }

    pub fn writers(&self) -> usize {
        self.state.lock().writers
    }

    pub fn is_active_writer(&self) -> bool {
        self.state.lock().is_owner()
    }
}

pub struct ReadGuard<'a> {
    lock: &'a ReadWriteLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        // Cannot fail: this guard's acquisition is still outstanding.
        let _ = self.lock.unlock_read();
    }
}

pub struct WriteGuard<'a> {
    lock: &'a ReadWriteLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.unlock_write();
    }
}
