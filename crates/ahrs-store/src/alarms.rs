//! 系统告警

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlarmId {
    AhrsComms,
    Attitude,
    Gps,
}

impl AlarmId {
    pub const COUNT: usize = 3;

    pub const ALL: [AlarmId; Self::COUNT] = [AlarmId::AhrsComms, AlarmId::Attitude, AlarmId::Gps];

    fn index(self) -> usize {
        self as usize
    }
}

/// 告警等级（按严重程度排序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlarmSeverity {
    #[default]
    Uninitialised,
    Ok,
    Warning,
    Error,
    Critical,
}

/// 告警对象：每个子系统一个等级
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemAlarms {
    alarms: [AlarmSeverity; AlarmId::COUNT],
}

impl SystemAlarms {
    pub fn get(&self, id: AlarmId) -> AlarmSeverity {
        self.alarms[id.index()]
    }

    pub fn set(&mut self, id: AlarmId, severity: AlarmSeverity) {
        self.alarms[id.index()] = severity;
    }

    /// 最高的告警等级
    pub fn worst(&self) -> AlarmSeverity {
        self.alarms.iter().copied().max().unwrap_or_default()
    }
}
