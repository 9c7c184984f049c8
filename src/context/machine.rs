/*!
 * Machine Context
 * Register and stack snapshot of a simulated process
 */

/// Number of general-purpose registers in a snapshot
pub const GP_REGISTERS: usize = 16;

/// Execution state handed over by the host for a new process
///
/// Cloning copies the stack contents, so a registered snapshot never aliases
/// the host's buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineContext {
    pub regs: [u64; GP_REGISTERS],
    pub sp: u64,
    pub pc: u64,
    pub stack: Vec<u8>,
}

impl MachineContext {
    /// Fresh context starting at `entry` with an empty stack of `stack_size` bytes
    pub fn new(entry: u64, stack_size: usize) -> Self {
        Self {
            regs: [0; GP_REGISTERS],
            sp: stack_size as u64,
            pc: entry,
            stack: vec![0; stack_size],
        }
    }

    /// Push a word onto the stack (grows downwards)
    ///
    /// Returns false on stack overflow, leaving the context unchanged.
    pub fn push(&mut self, value: u64) -> bool {
        let bytes = value.to_le_bytes();
        let Some(top) = (self.sp as usize).checked_sub(bytes.len()) else {
            return false;
        };
        let Some(word) = self.stack.get_mut(top..top + bytes.len()) else {
            return false;
        };
        word.copy_from_slice(&bytes);
        self.sp = top as u64;
        true
    }

    /// Pop the word at the top of the stack
    pub fn pop(&mut self) -> Option<u64> {
        let top = self.sp as usize;
        let word = self.stack.get(top..top + 8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(word);
        self.sp += 8;
        Some(u64::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut ctx = MachineContext::new(0x4000, 16);
        assert!(ctx.push(7));
        assert!(ctx.push(9));
        assert!(!ctx.push(1));
        assert_eq!(ctx.sp, 0);

        assert_eq!(ctx.pop(), Some(9));
        assert_eq!(ctx.pop(), Some(7));
        assert_eq!(ctx.pop(), None);
    }

    #[test]
    fn test_push_with_corrupt_sp() {
        let mut ctx = MachineContext::new(0, 16);
        ctx.sp = 64;
        assert!(!ctx.push(1));
        assert_eq!(ctx.sp, 64);
        assert_eq!(ctx.stack, vec![0; 16]);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = MachineContext::new(0, 8);
        let copy = original.clone();
        original.push(u64::MAX);
        assert_eq!(copy.stack, vec![0; 8]);
    }
}
