use std::collections::HashMap;

/// Instruction set of the virtual machine.
///
/// Bytecode is a flat `Vec<u32>`: each opcode word is followed by
/// [`Opcode::operand_count`] immediate words (table indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    Start,
    Halt,
    Const,
    Null,
    Checkpoint,
    If,
    Else,
    EndIf,
    ForeverLoop,
    RepeatLoop,
    RepeatLoopIndex1,
    UntilLoop,
    BeginUntilLoop,
    LoopEnd,
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Random,
    Round,
    Abs,
    Floor,
    Ceil,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    GreaterThan,
    LessThan,
    Equals,
    And,
    Or,
    Not,
    SetVar,
    ChangeVar,
    ReadVar,
    ReadList,
    ListAppend,
    ListDel,
    ListDelAll,
    ListInsert,
    ListReplace,
    ListGetItem,
    ListIndexOf,
    ListLength,
    ListContains,
    StrConcat,
    StrAt,
    StrLength,
    StrContains,
    Exec,
    InitProcedure,
    CallProcedure,
    AddArg,
    ReadArg,
    BreakFrame,
    Warp,
}

const OPCODES: [Opcode; 61] = [
    Opcode::Start,
    Opcode::Halt,
    Opcode::Const,
    Opcode::Null,
    Opcode::Checkpoint,
    Opcode::If,
    Opcode::Else,
    Opcode::EndIf,
    Opcode::ForeverLoop,
    Opcode::RepeatLoop,
    Opcode::RepeatLoopIndex1,
    Opcode::UntilLoop,
    Opcode::BeginUntilLoop,
    Opcode::LoopEnd,
    Opcode::Add,
    Opcode::Subtract,
    Opcode::Multiply,
    Opcode::Divide,
    Opcode::Mod,
    Opcode::Random,
    Opcode::Round,
    Opcode::Abs,
    Opcode::Floor,
    Opcode::Ceil,
    Opcode::Sqrt,
    Opcode::Sin,
    Opcode::Cos,
    Opcode::Tan,
    Opcode::Asin,
    Opcode::Acos,
    Opcode::Atan,
    Opcode::GreaterThan,
    Opcode::LessThan,
    Opcode::Equals,
    Opcode::And,
    Opcode::Or,
    Opcode::Not,
    Opcode::SetVar,
    Opcode::ChangeVar,
    Opcode::ReadVar,
    Opcode::ReadList,
    Opcode::ListAppend,
    Opcode::ListDel,
    Opcode::ListDelAll,
    Opcode::ListInsert,
    Opcode::ListReplace,
    Opcode::ListGetItem,
    Opcode::ListIndexOf,
    Opcode::ListLength,
    Opcode::ListContains,
    Opcode::StrConcat,
    Opcode::StrAt,
    Opcode::StrLength,
    Opcode::StrContains,
    Opcode::Exec,
    Opcode::InitProcedure,
    Opcode::CallProcedure,
    Opcode::AddArg,
    Opcode::ReadArg,
    Opcode::BreakFrame,
    Opcode::Warp,
];

impl Opcode {
    pub fn from_word(word: u32) -> Option<Opcode> {
        OPCODES.get(word as usize).copied()
    }

    pub fn operand_count(self) -> usize {
        match self {
            Opcode::Const
            | Opcode::SetVar
            | Opcode::ChangeVar
            | Opcode::ReadVar
            | Opcode::ReadList
            | Opcode::ListAppend
            | Opcode::ListDel
            | Opcode::ListDelAll
            | Opcode::ListInsert
            | Opcode::ListReplace
            | Opcode::ListGetItem
            | Opcode::ListIndexOf
            | Opcode::ListLength
            | Opcode::ListContains
            | Opcode::Exec
            | Opcode::CallProcedure
            | Opcode::ReadArg => 1,
            _ => 0,
        }
    }

    fn opens_loop(self) -> bool {
        matches!(
            self,
            Opcode::ForeverLoop | Opcode::RepeatLoop | Opcode::BeginUntilLoop
        )
    }
}

impl From<Opcode> for u32 {
    fn from(opcode: Opcode) -> Self {
        opcode as u32
    }
}

/// One executable bytecode blob with its precomputed branch targets.
///
/// `jumps` maps the address of `If`/`Else` to the matching `Else`/`EndIf`,
/// and `RepeatLoop`/`ForeverLoop`/`UntilLoop` to the matching `LoopEnd`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Code {
    pub words: Vec<u32>,
    jumps: HashMap<usize, usize>,
}

impl Code {
    pub fn new(words: Vec<u32>) -> Code {
        let jumps = branch_targets(&words);
        Code { words, jumps }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn jump(&self, address: usize) -> Option<usize> {
        self.jumps.get(&address).copied()
    }

    /// Decodes the instruction stream into opcodes with their operands.
    pub fn instructions(&self) -> Vec<(Opcode, Vec<u32>)> {
        let mut instructions = Vec::new();
        let mut ip = 0;
        while ip < self.words.len() {
            let Some(opcode) = Opcode::from_word(self.words[ip]) else {
                break;
            };
            let end = (ip + 1 + opcode.operand_count()).min(self.words.len());
            instructions.push((opcode, self.words[ip + 1..end].to_vec()));
            ip = end;
        }
        instructions
    }
}

fn branch_targets(words: &[u32]) -> HashMap<usize, usize> {
    let mut jumps = HashMap::new();
    let mut conditions: Vec<usize> = Vec::new();
    let mut loops: Vec<Vec<usize>> = Vec::new();
    let mut ip = 0;
    while ip < words.len() {
        let Some(opcode) = Opcode::from_word(words[ip]) else {
            break;
        };
        match opcode {
            Opcode::If => conditions.push(ip),
            Opcode::Else => {
                if let Some(start) = conditions.pop() {
                    jumps.insert(start, ip);
                }
                conditions.push(ip);
            }
            Opcode::EndIf => {
                if let Some(start) = conditions.pop() {
                    jumps.insert(start, ip);
                }
            }
            Opcode::UntilLoop => {
                if let Some(current) = loops.last_mut() {
                    current.push(ip);
                }
            }
            Opcode::LoopEnd => {
                if let Some(starts) = loops.pop() {
                    for start in starts {
                        jumps.insert(start, ip);
                    }
                }
            }
            opcode if opcode.opens_loop() => loops.push(vec![ip]),
            _ => {}
        }
        ip += 1 + opcode.operand_count();
    }
    jumps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(opcodes: &[Opcode]) -> Vec<u32> {
        opcodes.iter().map(|op| u32::from(*op)).collect()
    }

    #[test]
    fn opcode_words_round_trip() {
        for (i, opcode) in OPCODES.iter().enumerate() {
            assert_eq!(*opcode as u32, i as u32);
        }
        assert_eq!(Opcode::from_word(OPCODES.len() as u32), None);
    }

    #[test]
    fn nested_branch_targets() {
        // 0 Start, 1 RepeatLoop, 2 If, 3 Else, 4 EndIf, 5 BreakFrame, 6 LoopEnd, 7 Halt
        let code = Code::new(words(&[
            Opcode::Start,
            Opcode::RepeatLoop,
            Opcode::If,
            Opcode::Else,
            Opcode::EndIf,
            Opcode::BreakFrame,
            Opcode::LoopEnd,
            Opcode::Halt,
        ]));
        assert_eq!(code.jump(1), Some(6));
        assert_eq!(code.jump(2), Some(3));
        assert_eq!(code.jump(3), Some(4));
    }

    #[test]
    fn until_loop_targets_skip_operands() {
        let mut words = words(&[Opcode::BeginUntilLoop, Opcode::ReadVar]);
        words.push(u32::from(Opcode::LoopEnd)); // operand of ReadVar, not an instruction
        words.extend([
            u32::from(Opcode::UntilLoop),
            u32::from(Opcode::ForeverLoop),
            u32::from(Opcode::LoopEnd),
            u32::from(Opcode::LoopEnd),
        ]);
        let code = Code::new(words);
        assert_eq!(code.jump(0), Some(6));
        assert_eq!(code.jump(3), Some(6));
        assert_eq!(code.jump(4), Some(5));
        assert_eq!(code.instructions().len(), 6);
    }
}
