// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Cell types for sharing references in event-driven drivers.

use core::cell::Cell;

/// A shared reference to a mutable reference.
///
/// A `TakeCell` wraps potential reference to mutable memory that may be
/// available at a given point. Rather than enforcing borrow rules at
/// compile-time, `TakeCell` enables multiple clients to hold references to it,
/// but ensures that only one referrer has access to the underlying mutable
/// reference at a time. Clients either move the memory out of the `TakeCell`
/// or operate on a borrow within a closure.
pub struct TakeCell<'a, T: 'a + ?Sized> {
    val: Cell<Option<&'a mut T>>,
}

impl<'a, T: ?Sized> TakeCell<'a, T> {
    pub const fn empty() -> TakeCell<'a, T> {
        TakeCell {
            val: Cell::new(None),
        }
    }

    /// Creates a new `TakeCell` containing `value`.
    pub fn new(value: &'a mut T) -> TakeCell<'a, T> {
        TakeCell {
            val: Cell::new(Some(value)),
        }
    }

    pub fn is_none(&self) -> bool {
        let received = self.val.take();
        let result = received.is_none();
        self.val.set(received);
        result
    }

    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Takes the mutable reference out of the `TakeCell` leaving `None` in its
    /// place.
    pub fn take(&self) -> Option<&'a mut T> {
        self.val.take()
    }

    /// Stores `val` in the `TakeCell`, dropping the previous value if present.
    pub fn put(&self, val: Option<&'a mut T>) {
        self.val.set(val);
    }

    /// Replaces the contents of the `TakeCell` with `val`, returning the
    /// previous value if present.
    pub fn replace(&self, val: &'a mut T) -> Option<&'a mut T> {
        self.val.replace(Some(val))
    }

    /// Allows closure `closure` to borrow the contents of the `TakeCell`. If
    /// the `TakeCell` is empty, the closure is not run and `None` is returned.
    pub fn map<F, R>(&self, closure: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let maybe_val = self.val.take();
        maybe_val.map(|val| {
            let res = closure(val);
            self.val.set(Some(val));
            res
        })
    }

    /// Performs a `map` or returns a default value if the `TakeCell` is empty.
    pub fn map_or<F, R>(&self, default: R, closure: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        self.map(closure).unwrap_or(default)
    }
}

/// A `Cell` that holds an optional value.
///
/// Shorthand for a `Cell<Option<T>>` with convenience accessors for the
/// common client/buffer patterns in split-phase drivers.
pub struct OptionalCell<T> {
    value: Cell<Option<T>>,
}

impl<T> OptionalCell<T> {
    /// Create a new OptionalCell.
    pub const fn new(val: T) -> OptionalCell<T> {
        OptionalCell {
            value: Cell::new(Some(val)),
        }
    }

    /// Create an empty `OptionalCell` (contains just `None`).
    pub const fn empty() -> OptionalCell<T> {
        OptionalCell {
            value: Cell::new(None),
        }
    }

    /// Update the stored value.
    pub fn set(&self, val: T) {
        self.value.set(Some(val));
    }

    /// Reset the stored value to `None`.
    pub fn clear(&self) {
        self.value.set(None);
    }

    /// Check if the cell contains something.
    pub fn is_some(&self) -> bool {
        let has = self.value.take();
        let result = has.is_some();
        self.value.set(has);
        result
    }

    /// Check if the cell is None.
    pub fn is_none(&self) -> bool {
        !self.is_some()
    }

    /// Returns the contained value and replaces it with None.
    pub fn take(&self) -> Option<T> {
        self.value.take()
    }
}

impl<T: Copy> OptionalCell<T> {
    /// Returns a copy of the contained value.
    pub fn get(&self) -> Option<T> {
        self.value.get()
    }

    /// Call a closure on the value if the value exists.
    pub fn map<F, R>(&self, closure: F) -> Option<R>
    where
        F: FnOnce(T) -> R,
    {
        self.value.get().map(closure)
    }

    /// Call a closure on the value if the value exists, or return the
    /// default if it is empty.
    pub fn map_or<F, R>(&self, default: R, closure: F) -> R
    where
        F: FnOnce(T) -> R,
    {
        self.value.get().map_or(default, closure)
    }

    /// Returns the contained value or a default.
    pub fn unwrap_or(&self, default: T) -> T {
        self.value.get().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::{OptionalCell, TakeCell};

    #[test]
    fn take_cell_round_trips_buffer() {
        static mut BUF: [u8; 4] = [0; 4];
        let cell: TakeCell<'static, [u8]> = TakeCell::empty();
        assert!(cell.is_none());

        // Test-only: exclusive access to BUF.
        cell.put(Some(unsafe { &mut *core::ptr::addr_of_mut!(BUF) }));
        assert!(cell.is_some());

        let len = cell.map(|buf| {
            buf[0] = 0xA5;
            buf.len()
        });
        assert_eq!(len, Some(4));

        let buf = cell.take().unwrap();
        assert_eq!(buf[0], 0xA5);
        assert!(cell.is_none());
    }

    #[test]
    fn optional_cell_map_and_clear() {
        let cell = OptionalCell::new(7u32);
        assert_eq!(cell.map(|v| v + 1), Some(8));
        cell.clear();
        assert!(cell.is_none());
        assert_eq!(cell.unwrap_or(3), 3);
    }
}
