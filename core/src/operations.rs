use rand::Rng;

use crate::constants::{
    ADDRESS_MASK, DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_GLYPH_SIZE, STACK_SIZE,
};
use crate::error::{Chip8Error, Result};
use crate::instruction::Instruction;
use crate::quirks::Quirks;
use crate::state::{Keys, RunState, State};

/// Executes a single decoded instruction against `state`, returning the state that follows it.
///
/// Every operation moves the pc itself: most advance it by 2, skips advance it by 2 more when
/// their condition holds, and jumps, calls and returns assign it outright.
pub fn execute<R: Rng>(
    instruction: Instruction,
    state: &State,
    keys: &Keys,
    quirks: &Quirks,
    rng: &mut R,
) -> Result<State> {
    let next = match instruction {
        Instruction::Clear => clr(state),
        Instruction::Return => rts(state)?,
        Instruction::Jump { addr } => jump(state, addr),
        Instruction::Call { addr } => call(state, addr)?,
        Instruction::SkipEqByte { x, nn } => ske(state, x, nn),
        Instruction::SkipNeByte { x, nn } => skne(state, x, nn),
        Instruction::SkipEqReg { x, y } => skre(state, x, y),
        Instruction::LoadByte { x, nn } => load(state, x, nn),
        Instruction::AddByte { x, nn } => add(state, x, nn),
        Instruction::Move { x, y } => mv(state, x, y),
        Instruction::Or { x, y } => or(state, x, y),
        Instruction::And { x, y } => and(state, x, y),
        Instruction::Xor { x, y } => xor(state, x, y),
        Instruction::AddReg { x, y } => addr(state, x, y),
        Instruction::Sub { x, y } => sub(state, x, y),
        Instruction::ShiftRight { x } => shr(state, x),
        Instruction::SubN { x, y } => subn(state, x, y),
        Instruction::ShiftLeft { x } => shl(state, x),
        Instruction::SkipNeReg { x, y } => skrne(state, x, y),
        Instruction::LoadIndex { addr } => loadi(state, addr),
        Instruction::JumpOffset { addr } => jumpi(state, addr),
        Instruction::Random { x, nn } => rnd(state, x, nn, rng),
        Instruction::Draw { x, y, n } => draw(state, x, y, n),
        Instruction::SkipPressed { x } => skpr(state, x, keys),
        Instruction::SkipNotPressed { x } => skup(state, x, keys),
        Instruction::LoadDelay { x } => moved(state, x),
        Instruction::WaitKey { x } => keyd(state, x, keys),
        Instruction::SetDelay { x } => loads(state, x),
        Instruction::SetSound { x } => ld(state, x),
        Instruction::AddIndex { x } => addi(state, x),
        Instruction::LoadFont { x } => ldspr(state, x),
        Instruction::Bcd { x } => bcd(state, x),
        Instruction::Store { x } => stor(state, x, quirks),
        Instruction::Read { x } => read(state, x, quirks),
    };
    Ok(next)
}

/// The memory address `offset` bytes past `base`, wrapped to 12 bits
fn address(base: u16, offset: u16) -> usize {
    (base.wrapping_add(offset) & ADDRESS_MASK) as usize
}

/// The pc of the instruction following the current one, wrapped to 12 bits
fn next_pc(state: &State) -> u16 {
    state.pc.wrapping_add(0x2) & ADDRESS_MASK
}

/// pc += 2, then pc += 2 again if `condition` holds
fn skip_if(state: &State, condition: bool) -> State {
    let mut pc = next_pc(state);
    if condition {
        pc = pc.wrapping_add(0x2) & ADDRESS_MASK;
    }
    State { pc, ..*state }
}

fn is_pressed(keys: &Keys, key: u8) -> bool {
    keys.get(key as usize).copied().unwrap_or(false)
}

/// clear
pub fn clr(state: &State) -> State {
    State {
        pc: next_pc(state),
        frame_buffer: [0; DISPLAY_WIDTH * DISPLAY_HEIGHT],
        draw_flag: true,
        ..*state
    }
}

/// PC = STACK.pop()
pub fn rts(state: &State) -> Result<State> {
    if state.sp == 0 {
        return Err(Chip8Error::StackUnderflow { pc: state.pc });
    }
    let sp = state.sp - 0x1;
    Ok(State {
        pc: state.stack[sp as usize],
        sp,
        ..*state
    })
}

/// PC = addr
pub fn jump(state: &State, addr: u16) -> State {
    State { pc: addr, ..*state }
}

/// STACK.push(PC + 2); PC = addr
///
/// The address of the instruction after the call is pushed so that returning lands on it.
pub fn call(state: &State, addr: u16) -> Result<State> {
    if state.sp as usize >= STACK_SIZE {
        return Err(Chip8Error::StackOverflow { pc: state.pc });
    }
    let mut stack = state.stack;
    stack[state.sp as usize] = next_pc(state);
    Ok(State {
        pc: addr,
        sp: state.sp + 0x1,
        stack,
        ..*state
    })
}

/// if Vx == nn then pc += 2
pub fn ske(state: &State, x: u8, nn: u8) -> State {
    skip_if(state, state.v[x as usize] == nn)
}

/// if Vx != nn then pc += 2
pub fn skne(state: &State, x: u8, nn: u8) -> State {
    skip_if(state, state.v[x as usize] != nn)
}

/// if Vx == Vy then pc += 2
pub fn skre(state: &State, x: u8, y: u8) -> State {
    skip_if(state, state.v[x as usize] == state.v[y as usize])
}

/// Vx = nn
pub fn load(state: &State, x: u8, nn: u8) -> State {
    let mut v = state.v;
    v[x as usize] = nn;
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// Vx += nn
/// Add nn to Vx; allow for overflow but implicitly drop it
pub fn add(state: &State, x: u8, nn: u8) -> State {
    let mut v = state.v;
    v[x as usize] = v[x as usize].wrapping_add(nn);
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// Vx = Vy
pub fn mv(state: &State, x: u8, y: u8) -> State {
    let mut v = state.v;
    v[x as usize] = v[y as usize];
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// Vx |= Vy
pub fn or(state: &State, x: u8, y: u8) -> State {
    let mut v = state.v;
    v[x as usize] |= v[y as usize];
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// Vx &= Vy
pub fn and(state: &State, x: u8, y: u8) -> State {
    let mut v = state.v;
    v[x as usize] &= v[y as usize];
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// Vx ^= Vy
pub fn xor(state: &State, x: u8, y: u8) -> State {
    let mut v = state.v;
    v[x as usize] ^= v[y as usize];
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

// The flag-setting operations below read their operands out of `state` and write into a copy,
// so VF is always written last and an operand in VF is never clobbered before it's used.

/// Vx += Vy; VF = carry
pub fn addr(state: &State, x: u8, y: u8) -> State {
    let (res, carry) = state.v[x as usize].overflowing_add(state.v[y as usize]);
    let mut v = state.v;
    v[x as usize] = res;
    v[0xF] = carry as u8;
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// Vx -= Vy; VF = !borrow
pub fn sub(state: &State, x: u8, y: u8) -> State {
    let (vx, vy) = (state.v[x as usize], state.v[y as usize]);
    let mut v = state.v;
    v[x as usize] = vx.wrapping_sub(vy);
    v[0xF] = (vx >= vy) as u8;
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// Vx >>= 1; VF = shifted out bit
pub fn shr(state: &State, x: u8) -> State {
    let vx = state.v[x as usize];
    let mut v = state.v;
    v[x as usize] = vx >> 1;
    v[0xF] = vx & 0x1;
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// Vx = Vy - Vx; VF = !borrow
pub fn subn(state: &State, x: u8, y: u8) -> State {
    let (vx, vy) = (state.v[x as usize], state.v[y as usize]);
    let mut v = state.v;
    v[x as usize] = vy.wrapping_sub(vx);
    v[0xF] = (vy >= vx) as u8;
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// Vx <<= 1; VF = shifted out bit
pub fn shl(state: &State, x: u8) -> State {
    let vx = state.v[x as usize];
    let mut v = state.v;
    v[x as usize] = vx << 1;
    v[0xF] = vx >> 7;
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// if Vx != Vy then pc += 2
pub fn skrne(state: &State, x: u8, y: u8) -> State {
    skip_if(state, state.v[x as usize] != state.v[y as usize])
}

/// I = addr
pub fn loadi(state: &State, addr: u16) -> State {
    State {
        pc: next_pc(state),
        i: addr & ADDRESS_MASK,
        ..*state
    }
}

/// PC = V0 + addr
pub fn jumpi(state: &State, addr: u16) -> State {
    State {
        pc: (u16::from(state.v[0x0]) + addr) & ADDRESS_MASK,
        ..*state
    }
}

/// Vx = rand_byte & nn
pub fn rnd<R: Rng>(state: &State, x: u8, nn: u8, rng: &mut R) -> State {
    let rand_byte: u8 = rng.gen();
    let mut v = state.v;
    v[x as usize] = rand_byte & nn;
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory I..I+n at position Vx, Vy on the FrameBuffer with wrapping.
/// Sets VF if any pixels are erased
pub fn draw(state: &State, x: u8, y: u8, n: u8) -> State {
    let (origin_x, origin_y) = (state.v[x as usize] as usize, state.v[y as usize] as usize);
    let mut frame_buffer = state.frame_buffer;
    let mut collision = 0x0;

    for row in 0..n as usize {
        let sprite_row = state.memory[address(state.i, row as u16)];
        let py = (origin_y + row) % DISPLAY_HEIGHT;
        for bit in 0..8 {
            let px = (origin_x + bit) % DISPLAY_WIDTH;
            let pixel_value = (sprite_row >> (7 - bit)) & 0x1;
            let index = px + py * DISPLAY_WIDTH;
            collision |= pixel_value & frame_buffer[index];
            frame_buffer[index] ^= pixel_value;
        }
    }

    let mut v = state.v;
    v[0xF] = collision;
    State {
        pc: next_pc(state),
        draw_flag: true,
        v,
        frame_buffer,
        ..*state
    }
}

/// if Vx.pressed then pc += 2
pub fn skpr(state: &State, x: u8, keys: &Keys) -> State {
    skip_if(state, is_pressed(keys, state.v[x as usize]))
}

/// if !Vx.pressed then pc += 2
pub fn skup(state: &State, x: u8, keys: &Keys) -> State {
    skip_if(state, !is_pressed(keys, state.v[x as usize]))
}

/// Vx = DT
pub fn moved(state: &State, x: u8) -> State {
    let mut v = state.v;
    v[x as usize] = state.delay_timer;
    State {
        pc: next_pc(state),
        v,
        ..*state
    }
}

/// await keypress for Vx
///
/// The pc stays on this instruction until `resume_on_key` sees a key go down.
pub fn keyd(state: &State, x: u8, keys: &Keys) -> State {
    State {
        run_state: RunState::AwaitingKey {
            register: x,
            held: *keys,
        },
        ..*state
    }
}

/// Completes a pending FX0A once a key that wasn't previously held is pressed.
///
/// The lowest newly pressed key is written to the waiting register and execution moves past
/// the FX0A. Otherwise the observed key state is remembered so that a key which is released
/// and pressed again still counts.
pub fn resume_on_key(state: &State, keys: &Keys) -> State {
    let (register, held) = match state.run_state {
        RunState::AwaitingKey { register, held } => (register, held),
        _ => return *state,
    };

    let pressed = keys
        .iter()
        .zip(held.iter())
        .position(|(&now, &before)| now && !before);

    match pressed {
        Some(key) => {
            let mut v = state.v;
            v[register as usize] = key as u8;
            State {
                pc: next_pc(state),
                v,
                run_state: RunState::Running,
                ..*state
            }
        }
        None => State {
            run_state: RunState::AwaitingKey {
                register,
                held: *keys,
            },
            ..*state
        },
    }
}

/// DT = Vx
pub fn loads(state: &State, x: u8) -> State {
    State {
        pc: next_pc(state),
        delay_timer: state.v[x as usize],
        ..*state
    }
}

/// ST = Vx
pub fn ld(state: &State, x: u8) -> State {
    State {
        pc: next_pc(state),
        sound_timer: state.v[x as usize],
        ..*state
    }
}

/// I += Vx; VF = I overflowed 12 bits
pub fn addi(state: &State, x: u8) -> State {
    let sum = state.i + u16::from(state.v[x as usize]);
    let mut v = state.v;
    v[0xF] = (sum > ADDRESS_MASK) as u8;
    State {
        pc: next_pc(state),
        i: sum & ADDRESS_MASK,
        v,
        ..*state
    }
}

/// I = Vx * 5
/// Set I to the memory address of the font glyph for Vx
/// See constants::FONT_SET for more details
pub fn ldspr(state: &State, x: u8) -> State {
    State {
        pc: next_pc(state),
        i: (u16::from(state.v[x as usize]) * FONT_GLYPH_SIZE) & ADDRESS_MASK,
        ..*state
    }
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address I
pub fn bcd(state: &State, x: u8) -> State {
    let vx = state.v[x as usize];
    let mut memory = state.memory;
    memory[address(state.i, 0)] = vx / 100;
    memory[address(state.i, 1)] = vx / 10 % 10;
    memory[address(state.i, 2)] = vx % 10;
    State {
        pc: next_pc(state),
        memory,
        ..*state
    }
}

/// The value of I after copying V0..=Vx to or from memory
fn index_after_copy(state: &State, x: u8, quirks: &Quirks) -> u16 {
    if quirks.increment_index_on_store {
        state.i.wrapping_add(u16::from(x) + 1) & ADDRESS_MASK
    } else {
        state.i
    }
}

/// mem[I..=I+x] = V0..=Vx
pub fn stor(state: &State, x: u8, quirks: &Quirks) -> State {
    let mut memory = state.memory;
    for register in 0..=x {
        memory[address(state.i, u16::from(register))] = state.v[register as usize];
    }
    State {
        pc: next_pc(state),
        i: index_after_copy(state, x, quirks),
        memory,
        ..*state
    }
}

/// V0..=Vx = mem[I..=I+x]
pub fn read(state: &State, x: u8, quirks: &Quirks) -> State {
    let mut v = state.v;
    for register in 0..=x {
        v[register as usize] = state.memory[address(state.i, u16::from(register))];
    }
    State {
        pc: next_pc(state),
        i: index_after_copy(state, x, quirks),
        v,
        ..*state
    }
}
