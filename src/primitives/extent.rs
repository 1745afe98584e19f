/*!
 * Byte Extents and Parameter Stacks
 * By-reference argument passing for boundary calls
 */

use std::fmt;

/// A view of bytes handed across the boundary
///
/// Host inputs are pushed as borrowed views so a call never copies its
/// arguments; outputs produced inside the region come back owned.
pub enum Extent<'a> {
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

impl<'a> Extent<'a> {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Extent::Borrowed(bytes) => bytes,
            Extent::Owned(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        match self {
            Extent::Borrowed(bytes) => bytes.to_vec(),
            Extent::Owned(bytes) => bytes,
        }
    }
}

impl fmt::Debug for Extent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Extent::Borrowed(_) => "borrowed",
            Extent::Owned(_) => "owned",
        };
        write!(f, "Extent({}, {} bytes)", kind, self.len())
    }
}

/// Ordered stack of extents shared between host and region for one call
///
/// The host pushes inputs in order and the region pops them, last pushed
/// first. Results go to a separate output slot, so a region that writes
/// nothing hands back nothing rather than one of the host's inputs.
#[derive(Debug, Default)]
pub struct ParameterStack<'a> {
    items: Vec<Extent<'a>>,
    output: Option<Vec<u8>>,
}

impl<'a> ParameterStack<'a> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            output: None,
        }
    }

    /// Push a view of caller-owned bytes without copying
    pub fn push_by_reference(&mut self, bytes: &'a [u8]) {
        self.items.push(Extent::Borrowed(bytes));
    }

    /// Push bytes the stack takes ownership of
    pub fn push_owned(&mut self, bytes: Vec<u8>) {
        self.items.push(Extent::Owned(bytes));
    }

    pub fn pop(&mut self) -> Option<Extent<'a>> {
        self.items.pop()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.output = None;
    }

    /// Fill the output slot, replacing anything written earlier in the call
    pub fn write_output(&mut self, bytes: Vec<u8>) {
        self.output = Some(bytes);
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Take the output slot, leaving it empty
    pub fn take_output(&mut self) -> Option<Vec<u8>> {
        self.output.take()
    }
}
