mod additional_info_type;
mod block_type;
mod nal_unit_type;
mod sei_payload_type;

pub use additional_info_type::AdditionalInfoType;
pub use block_type::BlockType;
pub use nal_unit_type::NalUnitType;
pub use sei_payload_type::SeiPayloadType;
