pub struct Config {
    pub railways_file_name: String,
    pub stations_file_name: String,
    pub train_types_file_name: String,
    pub timetables_file_name: String,
    pub flight_routes_file_name: String,
    pub holidays_file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            railways_file_name: "railways.json".into(),
            stations_file_name: "stations.json".into(),
            train_types_file_name: "train_types.json".into(),
            timetables_file_name: "timetables.json".into(),
            flight_routes_file_name: "flight_routes.json".into(),
            holidays_file_name: "holidays.json".into(),
        }
    }
}
