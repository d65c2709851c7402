/// Where each of a user's devices sits, in device order
const LOCATIONS: [&str; 3] = ["Living Room", "Bedroom", "Kitchen"];

#[derive(Debug, Clone)]
pub struct Device {
    pub device_id: String,
    pub location: String,
}

#[derive(Debug, Clone)]
pub struct User {
    pub client_name: String,
    pub devices: Vec<Device>,
}

/// Builds the simulated users `user1..=userN`, each owning
/// `air_purifier_<user>_001..` devices.
pub fn build_roster(users: usize, devices_per_user: usize) -> Vec<User> {
    (1..=users)
        .map(|u| User {
            client_name: format!("user{}", u),
            devices: (1..=devices_per_user)
                .map(|d| Device {
                    device_id: format!("air_purifier_{}_{:03}", u, d),
                    location: LOCATIONS
                        .get(d - 1)
                        .map(|l| l.to_string())
                        .unwrap_or_else(|| format!("Room {}", d)),
                })
                .collect(),
        })
        .collect()
}
