//! Per-device topic names.

use ec_core::DeviceId;

/// What an inbound topic carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    SensorData,
    HeaterParameters,
    SteamerParameters,
}

/// The three topics a device publishes to or consumes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub sensor_data: String,
    pub set_heater_values: String,
    pub set_steamer_values: String,
}

impl Topics {
    /// Topics follow `/{device_id}/{purpose}/`.
    pub fn for_device(id: &DeviceId) -> Self {
        let id = id.as_str();
        Self {
            sensor_data: format!("/{id}/sensor_data/"),
            set_heater_values: format!("/{id}/set_heater_values/"),
            set_steamer_values: format!("/{id}/set_steamer_values/"),
        }
    }

    /// Exact-match classification; anything else is unknown.
    pub fn classify(&self, topic: &str) -> Option<TopicKind> {
        if topic == self.sensor_data {
            Some(TopicKind::SensorData)
        } else if topic == self.set_heater_values {
            Some(TopicKind::HeaterParameters)
        } else if topic == self.set_steamer_values {
            Some(TopicKind::SteamerParameters)
        } else {
            None
        }
    }

    /// All topics, in subscription order.
    pub fn all(&self) -> [&str; 3] {
        [
            &self.sensor_data,
            &self.set_heater_values,
            &self.set_steamer_values,
        ]
    }

    pub fn topic(&self, kind: TopicKind) -> &str {
        match kind {
            TopicKind::SensorData => &self.sensor_data,
            TopicKind::HeaterParameters => &self.set_heater_values,
            TopicKind::SteamerParameters => &self.set_steamer_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_device_id() {
        let topics = Topics::for_device(&DeviceId::new("box-1"));
        assert_eq!(topics.sensor_data, "/box-1/sensor_data/");
        assert_eq!(topics.set_heater_values, "/box-1/set_heater_values/");
        assert_eq!(topics.set_steamer_values, "/box-1/set_steamer_values/");
    }

    #[test]
    fn classify_is_exact() {
        let topics = Topics::for_device(&DeviceId::new("box-1"));
        assert_eq!(
            topics.classify("/box-1/sensor_data/"),
            Some(TopicKind::SensorData)
        );
        assert_eq!(
            topics.classify("/box-1/set_steamer_values/"),
            Some(TopicKind::SteamerParameters)
        );
        assert_eq!(topics.classify("/box-1/sensor_data"), None);
        assert_eq!(topics.classify("/box-2/sensor_data/"), None);
    }

    #[test]
    fn every_topic_classifies_to_its_own_kind() {
        let topics = Topics::for_device(&DeviceId::new("x"));
        for kind in [
            TopicKind::SensorData,
            TopicKind::HeaterParameters,
            TopicKind::SteamerParameters,
        ] {
            assert_eq!(topics.classify(topics.topic(kind)), Some(kind));
        }
        assert_eq!(topics.all().len(), 3);
    }
}
