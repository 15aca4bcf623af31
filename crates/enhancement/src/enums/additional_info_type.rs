use nutype_enum::nutype_enum;

nutype_enum! {
    /// Payload selector of an additional-info block, ISO/IEC 23094-2 -
    /// 7.3.10 (Table 14). Unknown types are skipped.
    pub enum AdditionalInfoType(u8) {
        /// Supplemental enhancement information.
        Sei = 0,
        /// Video usability information.
        Vui = 1,
        /// Sharpening filter configuration.
        SFilter = 23,
        /// Tone-mapper and deinterlacer configuration.
        Hdr = 25,
    }
}
