use pinboard::app::Pinboard;

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    iced::application("Pinboard", Pinboard::update, Pinboard::view)
        .theme(Pinboard::theme)
        .centered()
        .run_with(Pinboard::new)
}
