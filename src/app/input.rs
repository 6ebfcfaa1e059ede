// Command parsing for the interactive shell.

use crate::action::Action;
use crate::api::comments::Comment;
use crate::api::feed::{SortOption, TimeWindow};
use crate::app::DEFAULT_TARGET_TRACKS;

pub(super) enum Parsed {
    Action(Action),
    Help,
    Status,
    Empty,
    Unknown(String),
}

pub(super) fn parse_command(line: &str) -> Parsed {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return Parsed::Empty;
    };
    let rest: Vec<&str> = parts.collect();

    match cmd {
        "help" | "h" | "?" => Parsed::Help,
        "status" | "ls" => Parsed::Status,
        "quit" | "q" | "exit" => Parsed::Action(Action::Quit),

        "gen" | "g" => match rest.first() {
            Some(topic) => Parsed::Action(Action::GeneratePlaylist {
                topic: topic.to_string(),
                sort: rest.get(1).and_then(|s| SortOption::parse(s)),
                window: rest.get(2).and_then(|w| TimeWindow::parse(w)),
                target: rest
                    .get(3)
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(DEFAULT_TARGET_TRACKS),
            }),
            None => Parsed::Unknown("gen needs a topic".to_string()),
        },
        "load" => match rest.first() {
            Some(id) => Parsed::Action(Action::LoadPlaylist(id.to_string())),
            None => Parsed::Unknown("load needs a playlist id or number".to_string()),
        },
        "del" => match rest.first() {
            Some(id) => Parsed::Action(Action::DeletePlaylist(id.to_string())),
            None => Parsed::Unknown("del needs a playlist id".to_string()),
        },
        "refresh" => match rest.first() {
            Some(id) => Parsed::Action(Action::RefreshPlaylist(id.to_string())),
            None => Parsed::Unknown("refresh needs a playlist id".to_string()),
        },

        "next" | "n" => Parsed::Action(Action::NextTrack),
        "prev" | "p" => Parsed::Action(Action::PrevTrack),
        "play" => match rest.first().and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if n > 0 => Parsed::Action(Action::PlayTrackAt(n - 1)),
            _ => Parsed::Action(Action::TogglePlayPause),
        },
        "pause" | "pp" => Parsed::Action(Action::TogglePlayPause),
        "stop" => Parsed::Action(Action::Stop),
        "shuffle" | "s" => Parsed::Action(Action::ToggleShuffle),
        "repeat" | "r" => Parsed::Action(Action::CycleRepeat),
        "clear" => Parsed::Action(Action::ClearQueue),
        "rm" => match rest.first() {
            Some(id) => Parsed::Action(Action::RemoveTrack(id.to_string())),
            None => Parsed::Unknown("rm needs a track id".to_string()),
        },
        "seek" => match rest.first().and_then(|s| s.parse().ok()) {
            Some(secs) => Parsed::Action(Action::SeekTo(secs)),
            None => Parsed::Unknown("seek needs seconds".to_string()),
        },
        "vol+" | "+" => Parsed::Action(Action::VolumeUp),
        "vol-" | "-" => Parsed::Action(Action::VolumeDown),

        "sort" => match rest.first().and_then(|s| SortOption::parse(s)) {
            Some(sort) => Parsed::Action(Action::SetSort(sort)),
            None => Parsed::Unknown("sort needs one of hot/new/top/rising".to_string()),
        },
        "time" => match rest.first().and_then(|w| TimeWindow::parse(w)) {
            Some(window) => Parsed::Action(Action::SetWindow(window)),
            None => Parsed::Unknown("time needs one of hour/day/week/month/year/all".to_string()),
        },

        "comments" | "c" => match rest.first() {
            Some(permalink) => Parsed::Action(Action::LoadComments {
                permalink: permalink.to_string(),
            }),
            None => Parsed::Unknown("comments needs a permalink".to_string()),
        },

        "bg" => Parsed::Action(Action::Background),
        "fg" => Parsed::Action(Action::Foreground),

        other => Parsed::Unknown(other.to_string()),
    }
}

pub(super) fn print_help() {
    println!(
        "commands:\n  \
         gen <topic> [sort] [time] [count]  build a playlist from a topic feed\n  \
         load <n|id>    load a saved playlist    del <id>   delete one\n  \
         refresh <id>   rebuild from its topic   status     queue + history\n  \
         next/prev      change track             play <n>   jump to track n\n  \
         play|pause     toggle playback          stop       stop playback\n  \
         shuffle        toggle shuffle           repeat     cycle off/one/all\n  \
         rm <track-id>  remove from queue        clear      empty the queue\n  \
         seek <secs>    absolute seek            vol+/vol-  volume\n  \
         sort <mode>    hot/new/top/rising       time <win> top window\n  \
         comments <permalink>                    quit"
    );
}

pub(super) fn print_comments(comments: &[Comment]) {
    if comments.is_empty() {
        println!("no comments");
        return;
    }
    for comment in comments {
        print_comment(comment);
    }
}

fn print_comment(comment: &Comment) {
    let indent = "  ".repeat(comment.depth);
    println!(
        "{}{} [{}] {}",
        indent,
        comment.author,
        comment.score,
        comment.body.replace('\n', " ")
    );
    for reply in &comment.replies {
        print_comment(reply);
    }
}
