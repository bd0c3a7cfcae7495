use crate::ChatRequest;

/// Check if the issuer of `request` owns the channel it was sent in.
///
/// The issuer must carry moderator rights and their login must equal the
/// channel name, compared case-insensitively. Leading `#` on the channel
/// name is ignored.
pub fn is_channel_owner(request: &ChatRequest) -> bool {
    if !request.is_moderator {
        return false;
    }
    let channel = request.channel.trim_start_matches('#');
    !channel.is_empty() && request.author.eq_ignore_ascii_case(channel)
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn request(channel: &str, author: &str, is_moderator: bool) -> ChatRequest {
        ChatRequest {
            channel: channel.into(),
            author: author.into(),
            is_moderator,
            text: "!dump file.txt".into(),
        }
    }

    #[rstest]
    #[case("streamer", "streamer", true, true)]
    #[case("#streamer", "StreaMer", true, true)]
    #[case("streamer", "streamer", false, false)]
    #[case("streamer", "somemod", true, false)]
    #[case("", "", true, false)]
    fn owner_check(
        #[case] channel: &str,
        #[case] author: &str,
        #[case] is_moderator: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(
            is_channel_owner(&request(channel, author, is_moderator)),
            expected
        );
    }
}
