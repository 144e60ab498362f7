//! Property-based invariant checks over randomly generated stores and
//! operation sequences.

use proptest::prelude::*;
use sparsemem::{Address, Memory};

fn block_pairs() -> impl Strategy<Value = Vec<(Address, Vec<u8>)>> {
    prop::collection::vec(
        (-64i64..192, prop::collection::vec(any::<u8>(), 1..10)),
        0..8,
    )
}

#[derive(Debug, Clone)]
enum Op {
    Write(Address, Vec<u8>),
    Insert(Address, Vec<u8>),
    Delete(Address, Address),
    Clear(Address, Address),
    Fill(Address, Address, Vec<u8>),
    Flood(Address, Address, Vec<u8>),
    Reserve(Address, Address),
    Shift(Address),
    Append(u8),
    Pop,
}

fn op() -> impl Strategy<Value = Op> {
    let addr = -64i64..192;
    let data = prop::collection::vec(any::<u8>(), 1..8);
    prop_oneof![
        (addr.clone(), data.clone()).prop_map(|(a, d)| Op::Write(a, d)),
        (addr.clone(), data.clone()).prop_map(|(a, d)| Op::Insert(a, d)),
        (addr.clone(), 0i64..32).prop_map(|(a, n)| Op::Delete(a, a + n)),
        (addr.clone(), 0i64..32).prop_map(|(a, n)| Op::Clear(a, a + n)),
        (addr.clone(), 1i64..32, data.clone()).prop_map(|(a, n, d)| Op::Fill(a, a + n, d)),
        (addr.clone(), 1i64..32, data).prop_map(|(a, n, d)| Op::Flood(a, a + n, d)),
        (addr, 0i64..16).prop_map(|(a, n)| Op::Reserve(a, n)),
        (-40i64..40).prop_map(Op::Shift),
        any::<u8>().prop_map(Op::Append),
        Just(Op::Pop),
    ]
}

fn apply(memory: &mut Memory, op: &Op) {
    match op {
        Op::Write(address, data) => memory.write(*address, data),
        Op::Insert(address, data) => memory.insert(*address, data),
        Op::Delete(start, endex) => memory.delete(Some(*start), Some(*endex)),
        Op::Clear(start, endex) => memory.clear(Some(*start), Some(*endex)),
        Op::Fill(start, endex, pattern) => memory.fill(Some(*start), Some(*endex), pattern).unwrap(),
        Op::Flood(start, endex, pattern) => {
            memory.flood(Some(*start), Some(*endex), pattern).unwrap()
        }
        Op::Reserve(address, size) => memory.reserve(*address, *size),
        Op::Shift(offset) => memory.shift(*offset),
        Op::Append(value) => memory.append(*value),
        Op::Pop => {
            memory.pop();
        }
    }
}

proptest! {
    /// I1–I3 and bounds enclosure hold after any operation sequence.
    #[test]
    fn invariants_survive_random_ops(
        pairs in block_pairs(),
        ops in prop::collection::vec(op(), 1..24),
    ) {
        let mut memory = Memory::from_blocks(pairs);
        for op in &ops {
            apply(&mut memory, op);
            prop_assert!(memory.validate().is_ok(), "after {op:?}");
        }
    }

    /// Invariants also hold when every mutation happens under bounds.
    #[test]
    fn invariants_survive_random_ops_bounded(
        pairs in block_pairs(),
        ops in prop::collection::vec(op(), 1..24),
    ) {
        let mut memory = Memory::from_blocks(pairs);
        memory.set_bound_span(Some(-16), Some(128));
        for op in &ops {
            apply(&mut memory, op);
            prop_assert!(memory.validate().is_ok(), "after {op:?}");
            let (start, endex) = memory.bound_span();
            for (block_start, data) in memory.content_blocks() {
                prop_assert!(start.unwrap() <= block_start);
                prop_assert!(block_start + data.len() as Address <= endex.unwrap());
            }
        }
    }

    /// `content_size` agrees with the block lengths and the key count.
    #[test]
    fn content_size_agrees(pairs in block_pairs()) {
        let memory = Memory::from_blocks(pairs);
        let by_blocks: usize = memory.content_blocks().map(|(_, data)| data.len()).sum();
        prop_assert_eq!(memory.content_size(), by_blocks);
        prop_assert_eq!(memory.content_size(), memory.content_keys().count());
        prop_assert_eq!(memory.len(), (memory.endex() - memory.start()).max(0));
    }

    /// `peek` agrees with the mapping surface cell by cell.
    #[test]
    fn peek_agrees_with_items(pairs in block_pairs()) {
        let memory = Memory::from_blocks(pairs);
        let items: std::collections::BTreeMap<Address, u8> =
            memory.items(None, None).collect();
        for address in memory.start() - 2..memory.endex() + 2 {
            prop_assert_eq!(memory.peek(address), items.get(&address).copied());
        }
    }

    /// Intervals and in-range gaps partition the span with no overlap
    /// and no hole.
    #[test]
    fn intervals_and_gaps_partition_span(pairs in block_pairs()) {
        let memory = Memory::from_blocks(pairs);
        let (start, endex) = memory.span();

        let mut pieces: Vec<(Address, Address)> = memory.intervals(None, None).collect();
        pieces.extend(
            memory
                .gaps(Some(start), Some(endex))
                .filter_map(|(s, e)| Some((s?, e?))),
        );
        pieces.sort();

        let mut cursor = start;
        for (piece_start, piece_endex) in pieces {
            prop_assert_eq!(piece_start, cursor);
            prop_assert!(piece_start < piece_endex);
            cursor = piece_endex;
        }
        prop_assert_eq!(cursor, endex);
    }

    /// Round trip through the block-list representation.
    #[test]
    fn to_blocks_roundtrip(pairs in block_pairs()) {
        let memory = Memory::from_blocks(pairs);
        let rebuilt = Memory::from_blocks(memory.to_blocks(None, None));
        prop_assert_eq!(rebuilt, memory);
    }

    /// Backup, op, restore is identity for the range-destructive ops.
    #[test]
    fn backup_restore_identity(
        pairs in block_pairs(),
        start in -64i64..192,
        size in 1i64..32,
        data in prop::collection::vec(any::<u8>(), 1..8),
    ) {
        let endex = start + size;

        let original = Memory::from_blocks(pairs);

        let mut memory = original.clone();
        let backup = memory.write_backup(start, data.len() as Address);
        memory.write(start, &data);
        memory.write_restore(&backup);
        prop_assert_eq!(&memory, &original);

        let mut memory = original.clone();
        let backup = memory.delete_backup(Some(start), Some(endex));
        memory.delete(Some(start), Some(endex));
        memory.delete_restore(&backup);
        prop_assert_eq!(&memory, &original);

        let mut memory = original.clone();
        let backup = memory.clear_backup(Some(start), Some(endex));
        memory.clear(Some(start), Some(endex));
        memory.clear_restore(&backup);
        prop_assert_eq!(&memory, &original);

        let mut memory = original.clone();
        let backup = memory.insert_backup(start, data.len() as Address);
        memory.insert(start, &data);
        memory.insert_restore(&backup);
        prop_assert_eq!(&memory, &original);

        let mut memory = original.clone();
        let backup = memory.flood_backup(Some(start), Some(endex));
        memory.flood(Some(start), Some(endex), &data).unwrap();
        memory.flood_restore(&backup);
        prop_assert_eq!(&memory, &original);
    }

    /// Shifting back and forth without bounds is identity.
    #[test]
    fn shift_roundtrip(pairs in block_pairs(), offset in -1000i64..1000) {
        let original = Memory::from_blocks(pairs);
        let mut memory = original.clone();
        memory.shift(offset);
        memory.shift(-offset);
        prop_assert_eq!(memory, original);
    }

    /// Writing the same data twice is the same as writing it once.
    #[test]
    fn write_idempotent(
        pairs in block_pairs(),
        address in -64i64..192,
        data in prop::collection::vec(any::<u8>(), 1..8),
    ) {
        let mut once = Memory::from_blocks(pairs);
        let mut twice = once.clone();
        once.write(address, &data);
        twice.write(address, &data);
        twice.write(address, &data);
        prop_assert_eq!(once, twice);
    }

    /// Flooding is idempotent and only touches empty cells.
    #[test]
    fn flood_touches_only_gaps(
        pairs in block_pairs(),
        start in -64i64..192,
        size in 1i64..32,
        pattern in prop::collection::vec(any::<u8>(), 1..4),
    ) {
        let original = Memory::from_blocks(pairs);
        let mut once = original.clone();
        once.flood(Some(start), Some(start + size), &pattern).unwrap();
        let mut twice = once.clone();
        twice.flood(Some(start), Some(start + size), &pattern).unwrap();
        prop_assert_eq!(&twice, &once);

        for address in start..start + size {
            if let Some(value) = original.peek(address) {
                prop_assert_eq!(once.peek(address), Some(value));
            } else {
                prop_assert!(once.peek(address).is_some());
            }
        }
    }
}
