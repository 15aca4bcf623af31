use crate::error::Result;

/// GPU residual operations. `Set` and `SetZero` replace the prediction;
/// `ClearAndSet` clears a whole 32x32 block before any residuals in it
/// apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GpuOperation {
    /// Add residuals to the prediction.
    Add = 0,
    /// Write residuals, replacing the prediction.
    Set = 1,
    /// Write zeros.
    SetZero = 2,
    /// Clear the block starting at this TU.
    ClearAndSet = 3,
}

/// One fixed-size slot of the upload array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuCommand {
    /// The operation.
    pub operation: GpuOperation,
    /// Absolute TU index: block-order within the tile, or raster when
    /// the stream scans in raster order.
    pub tu_index: u32,
    /// Residual payload; the first 4 or 16 lanes are meaningful.
    pub residuals: [i16; 16],
}

/// A GPU command buffer for one tile: append during decode, then
/// [`GpuCmdBuffer::build`] groups the slots by operation for upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuCmdBuffer {
    commands: Vec<GpuCommand>,
    counts: [u32; 4],
    tu_raster_order: bool,
}

impl GpuCmdBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of appended commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether any command has been appended.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The command slots; grouped by operation once built.
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    /// Slot count per operation, filled in by [`GpuCmdBuffer::build`].
    pub fn operation_counts(&self) -> [u32; 4] {
        self.counts
    }

    /// Whether the tile was scanned in raster order (untiled,
    /// non-temporal streams).
    pub fn tu_raster_order(&self) -> bool {
        self.tu_raster_order
    }

    /// Clears the buffer for reuse, keeping its allocation.
    pub fn reset(&mut self) {
        self.commands.clear();
        self.counts = [0; 4];
    }

    /// A rollback mark for [`GpuCmdBuffer::truncate_to`].
    pub(crate) fn mark(&self) -> usize {
        self.commands.len()
    }

    /// Discards everything appended after `mark`.
    pub(crate) fn truncate_to(&mut self, mark: usize) {
        self.commands.truncate(mark);
    }

    /// Appends one command at an absolute TU index.
    pub(crate) fn append(
        &mut self,
        operation: GpuOperation,
        residuals: Option<&[i16; 16]>,
        tu_index: u32,
    ) -> Result<()> {
        self.commands.try_reserve(1)?;
        self.commands.push(GpuCommand {
            operation,
            tu_index,
            residuals: residuals.copied().unwrap_or([0; 16]),
        });
        Ok(())
    }

    /// Finalizes the buffer for upload: slots regroup by operation
    /// (stable, preserving decode order within each group) and the
    /// per-operation counts are recorded.
    pub(crate) fn build(&mut self, tu_raster_order: bool) {
        self.tu_raster_order = tu_raster_order;

        self.counts = [0; 4];
        for command in &self.commands {
            self.counts[command.operation as usize] += 1;
        }

        self.commands.sort_by_key(|command| command.operation);
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn build_groups_by_operation() {
        let mut buffer = GpuCmdBuffer::new();
        let residuals = [1i16; 16];

        buffer.append(GpuOperation::Add, Some(&residuals), 10).unwrap();
        buffer.append(GpuOperation::ClearAndSet, None, 0).unwrap();
        buffer.append(GpuOperation::Add, Some(&residuals), 20).unwrap();
        buffer.append(GpuOperation::Set, Some(&residuals), 12).unwrap();

        buffer.build(false);

        assert_eq!(buffer.operation_counts(), [2, 1, 0, 1]);
        // Grouped by operation, decode order preserved within a group.
        let ops: Vec<_> = buffer.commands().iter().map(|c| c.operation).collect();
        assert_eq!(
            ops,
            [GpuOperation::Add, GpuOperation::Add, GpuOperation::Set, GpuOperation::ClearAndSet]
        );
        let indices: Vec<_> = buffer.commands().iter().map(|c| c.tu_index).collect();
        assert_eq!(indices, [10, 20, 12, 0]);
        assert!(!buffer.tu_raster_order());
    }

    #[test]
    fn rollback_discards_partial_tile() {
        let mut buffer = GpuCmdBuffer::new();
        buffer.append(GpuOperation::SetZero, None, 1).unwrap();
        let mark = buffer.mark();
        buffer.append(GpuOperation::SetZero, None, 2).unwrap();
        buffer.truncate_to(mark);
        assert_eq!(buffer.len(), 1);
    }
}
