use nutype_enum::nutype_enum;

nutype_enum! {
    /// SEI payload types, ISO/IEC 23094-2 - D.2. Unknown payloads are
    /// skipped using the enclosing block size.
    pub enum SeiPayloadType(u8) {
        /// Mastering display colour volume, D.2.2.
        MasteringDisplayColourVolume = 1,
        /// Content light level information, D.2.3.
        ContentLightLevelInfo = 2,
        /// ITU-T T.35 registered user data; carries the V-Nova stream
        /// version byte.
        UserDataRegistered = 4,
    }
}
