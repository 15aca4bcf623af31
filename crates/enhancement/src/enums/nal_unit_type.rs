use nutype_enum::nutype_enum;

nutype_enum! {
    /// LCEVC NAL unit types as defined by ISO/IEC 23094-2 - 7.4.2.2 (Table 4).
    ///
    /// Only the two coded-picture types are meaningful to the enhancement
    /// decoder; everything else is rejected during unencapsulation.
    pub enum NalUnitType(u8) {
        /// Coded enhancement picture that is not an IDR picture.
        NonIdr = 28,
        /// Coded enhancement IDR picture. Global configuration takes
        /// effect from an IDR until the next IDR.
        Idr = 29,
    }
}
