//! Stack of nested evaluation scopes.
//!
//! Each nested clause whose content is being parsed pushes one [`ScopeFrame`].
//! The frame records which documents form the clause's children (members of
//! its own collection) and which form its parents (members of the enclosing
//! nested collection, or root documents at the outermost level).
//!
//! Frames are pushed and popped through [`ScopeGuard`], which pops on drop so
//! that an error propagating out of the content parser still leaves the stack
//! balanced.

use std::ops::{Deref, DerefMut};

use crate::{
    binding::PathBinding,
    schema::{BitFilter, SchemaNode},
};

/// Evaluation context of one nesting level.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeFrame {
    /// Documents the enclosing level is made of
    pub parent_filter: BitFilter,
    /// Documents of this level's nested collection
    pub child_filter: BitFilter,
    /// Nested collection of this level
    pub descriptor: SchemaNode,
    /// Nested collection of the enclosing level, `None` at the outermost level
    pub parent: Option<SchemaNode>,
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
    entered: usize,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a frame for `binding` and returns it.
    ///
    /// Prefer [`ScopeGuard::enter`], which pairs the push with a pop.
    pub fn enter(&mut self, binding: &PathBinding) -> &ScopeFrame {
        let parent = self.frames.last().map(|f| f.descriptor.clone());
        let parent_filter = match &parent {
            Some(node) => node.member_filter(),
            None => BitFilter::non_nested(),
        };

        let frame = ScopeFrame {
            parent_filter,
            child_filter: binding.descriptor().member_filter(),
            descriptor: binding.descriptor().clone(),
            parent,
        };

        tracing::trace!(
            path = binding.path(),
            depth = self.frames.len() + 1,
            parent = %frame.parent_filter,
            "entering nested scope"
        );

        let index = self.frames.len();
        self.frames.push(frame);
        self.entered += 1;
        &self.frames[index]
    }

    /// Pops the most recently pushed frame.
    pub fn leave(&mut self) -> Option<ScopeFrame> {
        let frame = self.frames.pop();
        if let Some(frame) = &frame {
            tracing::trace!(
                path = frame.descriptor.path(),
                depth = self.frames.len(),
                "leaving nested scope"
            );
        }
        frame
    }

    /// Active frame, if any.
    pub fn current(&self) -> Option<&ScopeFrame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total number of frames ever pushed onto this stack.
    pub fn entered(&self) -> usize {
        self.entered
    }
}

impl AsMut<ScopeStack> for ScopeStack {
    fn as_mut(&mut self) -> &mut ScopeStack {
        self
    }
}

/// Keeps one frame pushed for as long as it lives.
///
/// The guard borrows the owner of the stack mutably and dereferences to it,
/// so code running inside the scope (including nested scopes of its own)
/// goes through the guard.
pub struct ScopeGuard<'a, T: AsMut<ScopeStack>> {
    owner: &'a mut T,
    frame: ScopeFrame,
}

impl<'a, T: AsMut<ScopeStack>> ScopeGuard<'a, T> {
    pub fn enter(owner: &'a mut T, binding: &PathBinding) -> Self {
        let frame = owner.as_mut().enter(binding).clone();
        ScopeGuard { owner, frame }
    }

    /// Frame pushed by this guard.
    pub fn frame(&self) -> &ScopeFrame {
        &self.frame
    }
}

impl<T: AsMut<ScopeStack>> Deref for ScopeGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.owner
    }
}

impl<T: AsMut<ScopeStack>> DerefMut for ScopeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.owner
    }
}

impl<T: AsMut<ScopeStack>> Drop for ScopeGuard<'_, T> {
    fn drop(&mut self) {
        self.owner.as_mut().leave();
    }
}
