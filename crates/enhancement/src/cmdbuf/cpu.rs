use lcevc_bytes_util::{ByteReader, encode_multi_byte};

use crate::error::Result;

/// CPU residual operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuCmd {
    /// Add the residuals to the temporal prediction.
    Add = 0,
    /// Write the residuals, replacing the prediction.
    Set = 1,
    /// Write zeros.
    SetZero = 2,
    /// Clear the 32x32 block starting at this TU.
    Clear = 3,
}

impl CpuCmd {
    const fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            0 => Some(CpuCmd::Add),
            1 => Some(CpuCmd::Set),
            2 => Some(CpuCmd::SetZero),
            3 => Some(CpuCmd::Clear),
            _ => None,
        }
    }

    /// Whether the record carries a residual payload.
    const fn has_payload(self) -> bool {
        !matches!(self, CpuCmd::Clear)
    }
}

/// An apply-time entry point: a byte offset into the arena and the
/// absolute TU index in force there, so appliers can start mid-buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuEntryPoint {
    /// Byte offset of the first record of this segment.
    pub offset: usize,
    /// Number of commands before this segment.
    pub command_index: u32,
    /// Absolute TU index the segment's first jump is relative to.
    pub initial_tu_index: u32,
}

/// A decoded record, as an applier would see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCmdRecord {
    /// The operation.
    pub cmd: CpuCmd,
    /// TU-index delta from the previous record.
    pub jump: u32,
    /// Residual payload; the first 4 or 16 lanes are meaningful.
    pub residuals: [i16; 16],
}

/// An append-only command arena for one tile.
///
/// Record layout: one opcode byte, the TU-index delta as the bitstream's
/// multi-byte VLC, then `2 * num_layers` payload bytes for non-Clear
/// commands (residuals as little-endian i16, native to the applier).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuCmdBuffer {
    data: Vec<u8>,
    count: u32,
    layer_count: usize,
    entry_point_count: usize,
    entry_points: Vec<CpuEntryPoint>,
}

impl CpuCmdBuffer {
    /// Creates a buffer for `layer_count` residual lanes per command
    /// (4 for DD, 16 for DDS). `entry_point_count` above 0 asks for the
    /// arena to be partitioned for parallel apply after the decode.
    pub fn new(layer_count: usize, entry_point_count: usize) -> Self {
        Self {
            data: Vec::new(),
            count: 0,
            layer_count,
            entry_point_count,
            entry_points: Vec::new(),
        }
    }

    /// Number of appended commands.
    pub fn len(&self) -> u32 {
        self.count
    }

    /// Whether any command has been appended.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The residual lanes per command.
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// The computed entry points; empty until [`CpuCmdBuffer::split`].
    pub fn entry_points(&self) -> &[CpuEntryPoint] {
        &self.entry_points
    }

    /// Whether entry-point splitting was requested.
    pub(crate) fn wants_split(&self) -> bool {
        self.entry_point_count > 0
    }

    /// Clears the buffer for reuse, keeping its allocation.
    pub fn reset(&mut self) {
        self.data.clear();
        self.entry_points.clear();
        self.count = 0;
    }

    /// Discards everything appended after `mark`; used to drop a
    /// partially decoded tile on error.
    pub(crate) fn truncate_to(&mut self, mark: (usize, u32)) {
        self.data.truncate(mark.0);
        self.count = mark.1;
    }

    /// A rollback mark for [`CpuCmdBuffer::truncate_to`].
    pub(crate) fn mark(&self) -> (usize, u32) {
        (self.data.len(), self.count)
    }

    /// Appends one command. `jump` is the TU delta since the previous
    /// command. Growth is fallible; on failure nothing was appended.
    pub(crate) fn append(
        &mut self,
        cmd: CpuCmd,
        residuals: Option<&[i16; 16]>,
        jump: u32,
    ) -> Result<()> {
        debug_assert_eq!(cmd.has_payload(), residuals.is_some());

        let payload_len = if cmd.has_payload() { 2 * self.layer_count } else { 0 };
        // Opcode + at most 5 VLC bytes for a 32-bit jump.
        self.data.try_reserve(1 + 5 + payload_len)?;

        self.data.push(cmd as u8);
        encode_multi_byte(u64::from(jump), &mut self.data);

        if let Some(residuals) = residuals {
            for &lane in &residuals[..self.layer_count] {
                self.data.extend_from_slice(&lane.to_le_bytes());
            }
        }

        self.count += 1;
        Ok(())
    }

    /// Partitions the arena into up to the requested number of entry
    /// points of roughly equal command counts.
    pub(crate) fn split(&mut self) {
        self.entry_points.clear();
        if self.entry_point_count == 0 || self.count == 0 {
            return;
        }

        let per_segment = (self.count as usize).div_ceil(self.entry_point_count) as u32;

        let mut points = Vec::new();
        let mut tu_index = 0u64;
        let mut command_index = 0u32;
        let mut offset = 0usize;

        let iter = CpuCmdIter {
            reader: ByteReader::new(&self.data).ok(),
            layer_count: self.layer_count,
        };

        for record in iter {
            if command_index % per_segment == 0 {
                points.push(CpuEntryPoint {
                    offset,
                    command_index,
                    initial_tu_index: tu_index as u32,
                });
            }

            tu_index += u64::from(record.jump);
            offset += record_len(record.cmd, record.jump, self.layer_count);
            command_index += 1;
        }

        self.entry_points = points;
    }

    /// Iterates the records in decode order.
    pub fn iter(&self) -> CpuCmdIter<'_> {
        CpuCmdIter {
            reader: ByteReader::new(&self.data).ok(),
            layer_count: self.layer_count,
        }
    }
}

fn record_len(cmd: CpuCmd, jump: u32, layer_count: usize) -> usize {
    let mut vlc = Vec::with_capacity(5);
    encode_multi_byte(u64::from(jump), &mut vlc);
    1 + vlc.len() + if cmd.has_payload() { 2 * layer_count } else { 0 }
}

/// Decodes arena records back into [`CpuCmdRecord`]s.
pub struct CpuCmdIter<'a> {
    reader: Option<ByteReader<'a>>,
    layer_count: usize,
}

impl Iterator for CpuCmdIter<'_> {
    type Item = CpuCmdRecord;

    fn next(&mut self) -> Option<CpuCmdRecord> {
        let reader = self.reader.as_mut()?;
        if reader.remaining() == 0 {
            return None;
        }

        let cmd = CpuCmd::from_opcode(reader.read_u8().ok()?)?;
        let jump = reader.read_multi_byte().ok()? as u32;

        let mut residuals = [0i16; 16];
        if cmd.has_payload() {
            for lane in residuals.iter_mut().take(self.layer_count) {
                let bytes = reader.read_n(2).ok()?;
                *lane = i16::from_le_bytes([bytes[0], bytes[1]]);
            }
        }

        Some(CpuCmdRecord { cmd, jump, residuals })
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn append_and_read_back() {
        let mut buffer = CpuCmdBuffer::new(4, 0);
        let residuals = {
            let mut r = [0i16; 16];
            r[..4].copy_from_slice(&[1, -2, 3, -4]);
            r
        };

        buffer.append(CpuCmd::Add, Some(&residuals), 6).unwrap();
        buffer.append(CpuCmd::Clear, None, 250).unwrap();
        buffer.append(CpuCmd::Set, Some(&residuals), 1).unwrap();

        let records: Vec<_> = buffer.iter().collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].cmd, CpuCmd::Add);
        assert_eq!(records[0].jump, 6);
        assert_eq!(records[0].residuals[..4], [1, -2, 3, -4]);
        assert_eq!(records[1].cmd, CpuCmd::Clear);
        assert_eq!(records[1].jump, 250);
        assert_eq!(records[2].cmd, CpuCmd::Set);
    }

    #[test]
    fn split_partitions_by_command_count() {
        let mut buffer = CpuCmdBuffer::new(4, 2);
        let residuals = [0i16; 16];

        for _ in 0..10 {
            buffer.append(CpuCmd::Add, Some(&residuals), 3).unwrap();
        }

        buffer.split();
        let entry_points = buffer.entry_points();
        assert_eq!(entry_points.len(), 2);
        assert_eq!(entry_points[0].command_index, 0);
        assert_eq!(entry_points[0].initial_tu_index, 0);
        assert_eq!(entry_points[1].command_index, 5);
        // Five jumps of 3 precede the second segment.
        assert_eq!(entry_points[1].initial_tu_index, 15);
        assert!(entry_points[1].offset > 0);
    }

    #[test]
    fn rollback_discards_partial_tile() {
        let mut buffer = CpuCmdBuffer::new(16, 0);
        let residuals = [7i16; 16];

        buffer.append(CpuCmd::Add, Some(&residuals), 1).unwrap();
        let mark = buffer.mark();
        buffer.append(CpuCmd::Add, Some(&residuals), 2).unwrap();
        buffer.truncate_to(mark);

        // Only the record before the mark survives in the arena.
        let records: Vec<_> = buffer.iter().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].jump, 1);
    }

    #[test]
    fn reset_retains_capacity() {
        let mut buffer = CpuCmdBuffer::new(4, 1);
        buffer.append(CpuCmd::SetZero, Some(&[0i16; 16]), 0).unwrap();
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.iter().count(), 0);
    }
}
