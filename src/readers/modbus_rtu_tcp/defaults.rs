pub const PORT: u16 = 8899;
pub const TEMP1_SLAVE_ID: u8 = 1;
pub const TEMP2_SLAVE_ID: u8 = 2;
pub const FLOW_SLAVE_ID: u8 = 3;
/// Highest unicast slave address on an RTU line
pub const MAX_SLAVE_ID: u8 = 247;
