use nutype_enum::nutype_enum;

nutype_enum! {
    /// Configuration block types, ISO/IEC 23094-2 - 7.3.3 (Table 7).
    ///
    /// The low 5 bits of every block header carry one of these; unknown
    /// values are skipped using the signalled block size.
    pub enum BlockType(u8) {
        /// Profile, level and conformance-window information.
        SequenceConfig = 0,
        /// IDR-scoped stream geometry and tool configuration.
        GlobalConfig = 1,
        /// Per-picture quantization and filter configuration.
        PictureConfig = 2,
        /// Coefficient and temporal chunk data, one chunk per layer.
        EncodedData = 3,
        /// Coefficient and temporal chunk data with per-tile chunks.
        EncodedDataTiled = 4,
        /// SEI, VUI, sharpening and HDR payloads.
        AdditionalInfo = 5,
        /// Padding, skipped.
        Filler = 6,
    }
}
