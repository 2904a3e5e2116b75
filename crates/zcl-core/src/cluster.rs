//! ZCL cluster and attribute identifiers used by the metering device

/// Common ZCL cluster IDs
pub mod id {
    // General Clusters
    pub const BASIC: u16 = 0x0000;
    pub const POWER_CONFIG: u16 = 0x0001;
    pub const IDENTIFY: u16 = 0x0003;
    pub const GROUPS: u16 = 0x0004;
    pub const ON_OFF: u16 = 0x0006;
    pub const TIME: u16 = 0x000A;

    // Smart Energy
    pub const METERING: u16 = 0x0702;

    // Measurement
    pub const ELECTRICAL_MEASUREMENT: u16 = 0x0B04;
}

/// Profile IDs
pub mod profile {
    /// Home Automation profile
    pub const HA: u16 = 0x0104;
}

/// Metering cluster attributes (cluster 0x0702)
pub mod metering_attrs {
    pub const CURRENT_SUMMATION_DELIVERED: u16 = 0x0000;
    pub const CURRENT_TIER_1_SUMMATION_DELIVERED: u16 = 0x0100;
    pub const CURRENT_TIER_2_SUMMATION_DELIVERED: u16 = 0x0102;
    pub const CURRENT_TIER_3_SUMMATION_DELIVERED: u16 = 0x0104;
    pub const CURRENT_TIER_4_SUMMATION_DELIVERED: u16 = 0x0106;
    pub const STATUS: u16 = 0x0200;
    pub const UNIT_OF_MEASURE: u16 = 0x0300;
    pub const MULTIPLIER: u16 = 0x0301;
    pub const DIVISOR: u16 = 0x0302;
    pub const SUMMATION_FORMATTING: u16 = 0x0303;
    pub const METERING_DEVICE_TYPE: u16 = 0x0306;
}

/// Electrical measurement cluster attributes (cluster 0x0B04)
pub mod electrical_attrs {
    pub const MEASUREMENT_TYPE: u16 = 0x0000;
    pub const RMS_VOLTAGE: u16 = 0x0505;
    pub const RMS_CURRENT: u16 = 0x0508;
    pub const ACTIVE_POWER: u16 = 0x050B;
    pub const AC_VOLTAGE_MULTIPLIER: u16 = 0x0600;
    pub const AC_VOLTAGE_DIVISOR: u16 = 0x0601;
    pub const AC_CURRENT_MULTIPLIER: u16 = 0x0602;
    pub const AC_CURRENT_DIVISOR: u16 = 0x0603;
    pub const AC_POWER_MULTIPLIER: u16 = 0x0604;
    pub const AC_POWER_DIVISOR: u16 = 0x0605;
}
