macro_rules! list {
    ($($pub:vis $module:ident$(: {$($cmd:ident),+})?),+) => {
        $(
            $pub mod $module;
            use $module::$module;

            $(
                $(
                    use $module::$cmd;
                )+
            )?
        )+

        pub fn list() -> Vec<crate::utils::poise::Command> {
            vec![
                $(
                    $module(),
                    $($($cmd(),)+)?
                )+
            ]
        }
    };
}

list! {
    prefixgame,
    rhyme,
    wordsearch: {endwordsearch},
    unscramble: {guess, hint, reveal},
    points: {leaderboard},
    pub comfort: {lonely, dysmorphia, suicidal, anxious, addiction, attention, sad},
    pub ask
}

mod round;
