/// Handle every node emits on unconditional success.
pub const OUTPUT_HANDLE: &str = "output";
/// Handle a loop node emits once per array item.
pub const LOOP_BODY_HANDLE: &str = "loopBody";
/// Handle a loop node emits once after all items.
pub const LOOP_END_HANDLE: &str = "loopEnd";
/// Handle a conditional node emits when no condition holds.
pub const DEFAULT_CONDITION_HANDLE: &str = "default";
