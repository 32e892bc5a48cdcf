fn main() {
    // Propagates ESP-IDF cfg/link flags when building for the device.
    // On host builds this is a no-op (no sysenv present).
    embuild::espidf::sysenv::output();
}
